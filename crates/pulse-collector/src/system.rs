use crate::MetricSource;
use anyhow::{bail, Result};
use std::collections::HashMap;
use sysinfo::System;

/// Host-wide memory, swap, per-core CPU and load readings.
pub struct SystemSource {
    system: System,
    gauges: HashMap<String, f64>,
    counters: HashMap<String, i64>,
}

impl SystemSource {
    pub fn new() -> Self {
        let mut system = System::new();
        // CPU usage is computed between two refreshes; prime the first one.
        system.refresh_cpu_all();
        Self {
            system,
            gauges: HashMap::new(),
            counters: HashMap::new(),
        }
    }
}

impl Default for SystemSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSource for SystemSource {
    fn name(&self) -> &str {
        "system"
    }

    fn update(&mut self) -> Result<()> {
        self.system.refresh_memory();
        self.system.refresh_cpu_all();

        let total = self.system.total_memory();
        if total == 0 {
            bail!("memory statistics unavailable");
        }

        self.gauges.clear();
        self.gauges.insert("TotalMemory".into(), total as f64);
        self.gauges.insert("FreeMemory".into(), self.system.free_memory() as f64);
        self.gauges.insert("AvailableMemory".into(), self.system.available_memory() as f64);
        self.gauges.insert("UsedMemory".into(), self.system.used_memory() as f64);
        self.gauges.insert("TotalSwap".into(), self.system.total_swap() as f64);
        self.gauges.insert("UsedSwap".into(), self.system.used_swap() as f64);

        for (i, cpu) in self.system.cpus().iter().enumerate() {
            self.gauges.insert(format!("CPUutilization{i}"), f64::from(cpu.cpu_usage()));
        }

        let load = System::load_average();
        self.gauges.insert("LoadAverage1".into(), load.one);
        self.gauges.insert("LoadAverage5".into(), load.five);
        self.gauges.insert("LoadAverage15".into(), load.fifteen);
        Ok(())
    }

    fn gauges(&self) -> &HashMap<String, f64> {
        &self.gauges
    }

    fn counters(&self) -> &HashMap<String, i64> {
        &self.counters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_reports_memory_and_cpu_gauges() {
        let mut source = SystemSource::new();
        source.update().unwrap();

        let gauges = source.gauges();
        assert!(gauges["TotalMemory"] > 0.0);
        assert!(gauges["FreeMemory"] <= gauges["TotalMemory"]);
        assert!(gauges.contains_key("CPUutilization0"));
        assert!(gauges.contains_key("LoadAverage1"));
        assert!(source.counters().is_empty());
    }
}

use crate::MetricSource;
use anyhow::{anyhow, Result};
use rand::Rng;
use std::collections::HashMap;
use sysinfo::{Pid, ProcessRefreshKind, RefreshKind, System};

/// Readings about the agent process itself, plus the poll counter and a
/// random liveness value.
pub struct RuntimeSource {
    system: System,
    pid: Pid,
    poll_count: i64,
    gauges: HashMap<String, f64>,
    counters: HashMap<String, i64>,
}

impl RuntimeSource {
    pub fn new() -> Result<Self> {
        let pid = sysinfo::get_current_pid().map_err(|e| anyhow!("current pid: {e}"))?;
        Ok(Self {
            system: System::new(),
            pid,
            poll_count: 0,
            gauges: HashMap::new(),
            counters: HashMap::new(),
        })
    }

    /// Total number of successful updates.
    pub fn poll_count(&self) -> i64 {
        self.poll_count
    }
}

impl MetricSource for RuntimeSource {
    fn name(&self) -> &str {
        "runtime"
    }

    fn update(&mut self) -> Result<()> {
        self.system.refresh_specifics(
            RefreshKind::new().with_processes(
                ProcessRefreshKind::new()
                    .with_cpu()
                    .with_memory()
                    .with_disk_usage(),
            ),
        );
        let process = self
            .system
            .process(self.pid)
            .ok_or_else(|| anyhow!("process {} not visible", self.pid))?;
        let disk = process.disk_usage();

        self.gauges.clear();
        self.gauges.insert("ProcessResidentMemory".into(), process.memory() as f64);
        self.gauges.insert("ProcessVirtualMemory".into(), process.virtual_memory() as f64);
        self.gauges.insert("ProcessCPUUsage".into(), f64::from(process.cpu_usage()));
        self.gauges.insert("ProcessRunTime".into(), process.run_time() as f64);
        self.gauges.insert("ProcessDiskRead".into(), disk.total_read_bytes as f64);
        self.gauges.insert("ProcessDiskWritten".into(), disk.total_written_bytes as f64);
        self.gauges.insert("RandomValue".into(), rand::thread_rng().gen::<f64>());

        self.poll_count += 1;
        self.counters.insert("PollCount".into(), 1);
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
    fn update_reports_process_readings_and_poll_increment() {
        let mut source = RuntimeSource::new().unwrap();
        source.update().unwrap();
        source.update().unwrap();

        assert_eq!(source.poll_count(), 2);
        assert_eq!(source.counters().get("PollCount"), Some(&1));
        assert!(source.gauges()["ProcessResidentMemory"] > 0.0);
        let random = source.gauges()["RandomValue"];
        assert!((0.0..1.0).contains(&random));
    }

    #[test]
    fn random_value_changes_between_updates() {
        let mut source = RuntimeSource::new().unwrap();
        let mut seen = Vec::new();
        for _ in 0..5 {
            source.update().unwrap();
            seen.push(source.gauges()["RandomValue"]);
        }
        seen.dedup();
        assert!(seen.len() > 1);
    }
}

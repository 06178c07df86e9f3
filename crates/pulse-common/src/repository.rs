//! In-memory state of every known metric.

use crate::error::MetricError;
use crate::sign::Signer;
use crate::types::{Metric, MetricKind};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Latest gauge values and accumulated counters, each map behind its own lock.
///
/// The server keeps the canonical state here; the agent uses a private
/// instance as its aggregation buffer. Metrics returned from the repository
/// are signed with the repository's [`Signer`].
#[derive(Debug, Default)]
pub struct Repository {
    gauges: RwLock<HashMap<String, f64>>,
    counters: RwLock<HashMap<String, i64>>,
    signer: Signer,
}

impl Repository {
    pub fn new(signer: Signer) -> Self {
        Self {
            gauges: RwLock::default(),
            counters: RwLock::default(),
            signer,
        }
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    /// Overwrites the gauge.
    pub fn update_gauge(&self, name: &str, value: f64) {
        self.gauges.write().insert(name.to_string(), value);
    }

    /// Adds `delta` to the counter, creating it at zero first.
    pub fn update_counter(&self, name: &str, delta: i64) {
        let mut counters = self.counters.write();
        let entry = counters.entry(name.to_string()).or_insert(0);
        *entry = entry.wrapping_add(delta);
    }

    pub fn update_metric(&self, metric: &Metric) -> Result<(), MetricError> {
        let missing = || MetricError::MissingValue {
            id: metric.id.clone(),
            kind: metric.kind,
        };
        match metric.kind {
            MetricKind::Gauge => self.update_gauge(&metric.id, metric.value.ok_or_else(missing)?),
            MetricKind::Counter => {
                self.update_counter(&metric.id, metric.delta.ok_or_else(missing)?)
            }
        }
        Ok(())
    }

    pub fn gauge(&self, name: &str) -> Option<f64> {
        self.gauges.read().get(name).copied()
    }

    pub fn counter(&self, name: &str) -> Option<i64> {
        self.counters.read().get(name).copied()
    }

    /// Looks up one metric and signs it with the current key.
    pub fn metric(&self, name: &str, kind: MetricKind) -> Option<Metric> {
        let metric = match kind {
            MetricKind::Gauge => Metric::gauge(name, self.gauge(name)?),
            MetricKind::Counter => Metric::counter(name, self.counter(name)?),
        };
        Some(self.signer.signed(metric))
    }

    /// Full snapshot, gauges first, each group ordered by name.
    pub fn to_metrics(&self) -> Vec<Metric> {
        let mut gauges: Vec<Metric> = self
            .gauges
            .read()
            .iter()
            .map(|(name, value)| self.signer.signed(Metric::gauge(name.clone(), *value)))
            .collect();
        gauges.sort_by(|a, b| a.id.cmp(&b.id));

        let mut counters: Vec<Metric> = self
            .counters
            .read()
            .iter()
            .map(|(name, delta)| self.signer.signed(Metric::counter(name.clone(), *delta)))
            .collect();
        counters.sort_by(|a, b| a.id.cmp(&b.id));

        gauges.extend(counters);
        gauges
    }

    /// Applies every metric in `metrics`, skipping entries without a value.
    ///
    /// Returns the number of metrics applied.
    pub fn from_metrics(&self, metrics: &[Metric]) -> usize {
        let mut applied = 0;
        for metric in metrics {
            match self.update_metric(metric) {
                Ok(()) => applied += 1,
                Err(e) => tracing::warn!(error = %e, "Skipping metric during bulk load"),
            }
        }
        applied
    }

    pub fn clear(&self) {
        self.gauges.write().clear();
        self.counters.write().clear();
    }

    pub fn len(&self) -> usize {
        self.gauges.read().len() + self.counters.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn gauges_overwrite_and_counters_accumulate() {
        let repo = Repository::default();
        repo.update_gauge("g", 1.0);
        repo.update_gauge("g", 2.5);
        repo.update_counter("c", 5);
        repo.update_counter("c", 10);
        assert_eq!(repo.gauge("g"), Some(2.5));
        assert_eq!(repo.counter("c"), Some(15));
        assert_eq!(repo.gauge("c"), None);
        assert_eq!(repo.counter("missing"), None);
    }

    #[test]
    fn gauge_and_counter_namespaces_are_independent() {
        let repo = Repository::default();
        repo.update_gauge("x", 1.0);
        repo.update_counter("x", 2);
        assert_eq!(repo.gauge("x"), Some(1.0));
        assert_eq!(repo.counter("x"), Some(2));
        assert_eq!(repo.len(), 2);
    }

    #[test]
    fn update_metric_requires_a_value() {
        let repo = Repository::default();
        let mut m = Metric::gauge("g", 1.0);
        m.value = None;
        assert!(matches!(
            repo.update_metric(&m),
            Err(MetricError::MissingValue { .. })
        ));
        assert!(repo.is_empty());
    }

    #[test]
    fn concurrent_counter_updates_sum_exactly() {
        let repo = Arc::new(Repository::default());
        let threads = 8;
        let per_thread = 1_000;
        thread::scope(|s| {
            for t in 0..threads {
                let repo = Arc::clone(&repo);
                s.spawn(move || {
                    for _ in 0..per_thread {
                        repo.update_counter("hits", t + 1);
                    }
                });
            }
        });
        let expected: i64 = (1..=threads).map(|t| t * per_thread).sum();
        assert_eq!(repo.counter("hits"), Some(expected));
    }

    #[test]
    fn gauge_keeps_the_last_ordered_write() {
        let repo = Arc::new(Repository::default());
        let writers = 6;
        let barrier = Arc::new(Barrier::new(writers));
        thread::scope(|s| {
            for i in 0..writers {
                let repo = Arc::clone(&repo);
                let barrier = Arc::clone(&barrier);
                s.spawn(move || {
                    // round r lets only writer r write, then everyone syncs
                    for round in 0..writers {
                        if round == i {
                            repo.update_gauge("g", i as f64);
                        }
                        barrier.wait();
                    }
                });
            }
        });
        assert_eq!(repo.gauge("g"), Some((writers - 1) as f64));
    }

    #[test]
    fn to_metrics_signs_every_entry() {
        let signer = Signer::new("abc");
        let repo = Repository::new(signer.clone());
        repo.update_gauge("b", 2.0);
        repo.update_gauge("a", 1.0);
        repo.update_counter("c", 3);

        let metrics = repo.to_metrics();
        let ids: Vec<&str> = metrics.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert!(metrics.iter().all(|m| m.hash.is_some() && signer.verify(m)));
    }

    #[test]
    fn metric_lookup_is_signed() {
        let signer = Signer::new("abc");
        let repo = Repository::new(signer.clone());
        repo.update_counter("hits", 4);
        let m = repo.metric("hits", MetricKind::Counter).unwrap();
        assert_eq!(m.delta, Some(4));
        assert!(signer.verify(&m));
        assert!(repo.metric("hits", MetricKind::Gauge).is_none());
    }

    #[test]
    fn from_metrics_skips_malformed_entries() {
        let repo = Repository::default();
        let mut broken = Metric::counter("broken", 1);
        broken.delta = None;
        let applied = repo.from_metrics(&[Metric::gauge("g", 1.5), broken, Metric::counter("c", 3)]);
        assert_eq!(applied, 2);
        assert_eq!(repo.gauge("g"), Some(1.5));
        assert_eq!(repo.counter("c"), Some(3));
        assert_eq!(repo.counter("broken"), None);
    }

    #[test]
    fn clear_empties_both_maps() {
        let repo = Repository::default();
        repo.update_gauge("g", 1.0);
        repo.update_counter("c", 1);
        repo.clear();
        assert!(repo.is_empty());
    }
}

//! Metric sources for the pulse agent and the loop that polls them.
//!
//! Each [`MetricSource`] keeps its latest readings in memory; a
//! [`Collector`] refreshes one source on a fixed interval and hands the
//! signed readings to the sender through a bounded channel.

pub mod runtime;
pub mod system;

use anyhow::Result;
use pulse_common::{Metric, Signer};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub use runtime::RuntimeSource;
pub use system::SystemSource;

/// A producer of gauge readings and counter increments.
pub trait MetricSource: Send + Sync {
    /// Source name used in log lines.
    fn name(&self) -> &str;

    /// Refreshes the readings.
    ///
    /// # Errors
    ///
    /// Returns an error if the host could not be read; the previous
    /// readings must not be reported for that tick.
    fn update(&mut self) -> Result<()>;

    /// Latest gauge readings, overwrite semantics.
    fn gauges(&self) -> &HashMap<String, f64>;

    /// Counter increments produced by the last update, additive semantics.
    fn counters(&self) -> &HashMap<String, i64>;
}

/// Polls one [`MetricSource`] and turns its readings into signed metrics.
pub struct Collector {
    source: Box<dyn MetricSource>,
    signer: Signer,
    poll_interval: Duration,
}

impl Collector {
    pub fn new(source: Box<dyn MetricSource>, signer: Signer, poll_interval: Duration) -> Self {
        Self {
            source,
            signer,
            poll_interval,
        }
    }

    pub fn name(&self) -> &str {
        self.source.name()
    }

    /// Refreshes the source once; a failed read yields an empty batch.
    pub fn poll(&mut self) -> Vec<Metric> {
        if let Err(e) = self.source.update() {
            tracing::warn!(source = self.source.name(), error = %e, "Metric source update failed");
            return Vec::new();
        }

        let gauges = self.source.gauges();
        let counters = self.source.counters();
        let mut batch = Vec::with_capacity(gauges.len() + counters.len());
        for (name, value) in gauges {
            batch.push(self.signer.signed(Metric::gauge(name.clone(), *value)));
        }
        for (name, delta) in counters {
            batch.push(self.signer.signed(Metric::counter(name.clone(), *delta)));
        }
        batch
    }

    /// Polls until `cancel` fires, pushing every non-empty batch into `tx`.
    ///
    /// `tx` is expected to be bounded; a full channel suspends polling until
    /// the sender has taken the previous batch.
    pub async fn run(mut self, tx: mpsc::Sender<Vec<Metric>>, cancel: CancellationToken) {
        let mut tick = tokio::time::interval(self.poll_interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(
            source = self.name(),
            interval_ms = self.poll_interval.as_millis() as u64,
            "Collector started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tick.tick() => {
                    let batch = self.poll();
                    if batch.is_empty() {
                        continue;
                    }
                    tracing::debug!(source = self.name(), count = batch.len(), "Collected metrics");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        sent = tx.send(batch) => {
                            if sent.is_err() {
                                tracing::warn!(source = self.name(), "Sender is gone, stopping collector");
                                break;
                            }
                        }
                    }
                }
            }
        }
        tracing::info!(source = self.name(), "Collector stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_common::MetricKind;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct FakeSource {
        gauges: HashMap<String, f64>,
        counters: HashMap<String, i64>,
        fail: bool,
        updates: Arc<AtomicU32>,
    }

    impl FakeSource {
        fn new(fail: bool) -> Self {
            Self {
                gauges: HashMap::new(),
                counters: HashMap::new(),
                fail,
                updates: Arc::new(AtomicU32::new(0)),
            }
        }
    }

    impl MetricSource for FakeSource {
        fn name(&self) -> &str {
            "fake"
        }

        fn update(&mut self) -> Result<()> {
            if self.fail {
                anyhow::bail!("host unreadable");
            }
            let n = self.updates.fetch_add(1, Ordering::SeqCst) + 1;
            self.gauges.insert("Temp".into(), f64::from(n));
            self.counters.insert("Ticks".into(), 1);
            Ok(())
        }

        fn gauges(&self) -> &HashMap<String, f64> {
            &self.gauges
        }

        fn counters(&self) -> &HashMap<String, i64> {
            &self.counters
        }
    }

    #[test]
    fn poll_signs_every_reading() {
        let signer = Signer::new("abc");
        let mut collector = Collector::new(
            Box::new(FakeSource::new(false)),
            signer.clone(),
            Duration::from_millis(10),
        );
        let batch = collector.poll();
        assert_eq!(batch.len(), 2);
        assert!(batch.iter().all(|m| signer.verify(m)));
        let temp = batch.iter().find(|m| m.kind == MetricKind::Gauge).unwrap();
        assert_eq!(temp.value, Some(1.0));
    }

    #[test]
    fn failed_update_yields_empty_batch() {
        let mut collector = Collector::new(
            Box::new(FakeSource::new(true)),
            Signer::disabled(),
            Duration::from_millis(10),
        );
        assert!(collector.poll().is_empty());
    }

    #[tokio::test]
    async fn run_blocks_on_full_queue_and_stops_on_cancel() {
        let (tx, mut rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let source = FakeSource::new(false);
        let updates = source.updates.clone();
        let collector = Collector::new(Box::new(source), Signer::disabled(), Duration::from_millis(5));
        let handle = tokio::spawn(collector.run(tx, cancel.clone()));

        // One batch sits in the queue, one is parked on the send.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(updates.load(Ordering::SeqCst) <= 2);

        let temp = |batch: Vec<Metric>| batch.iter().find(|m| m.id == "Temp").unwrap().value;
        assert_eq!(temp(rx.recv().await.unwrap()), Some(1.0));
        assert_eq!(temp(rx.recv().await.unwrap()), Some(2.0));

        cancel.cancel();
        handle.await.unwrap();
    }
}

//! Aggregates collector batches and reports them on a fixed interval.
//!
//! The buffer is never reset after a report: every tick sends the full
//! snapshot, so counters the server has already added are added again.

use crate::transport::Transport;
use pulse_common::{Metric, Repository, Signer};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Upper bound on the report sent after cancellation.
const FINAL_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Sender {
    buffer: Repository,
    transport: Box<dyn Transport>,
    report_interval: Duration,
    final_flush_timeout: Duration,
}

impl Sender {
    pub fn new(transport: Box<dyn Transport>, signer: Signer, report_interval: Duration) -> Self {
        Self {
            buffer: Repository::new(signer),
            transport,
            report_interval,
            final_flush_timeout: FINAL_FLUSH_TIMEOUT,
        }
    }

    pub fn with_final_flush_timeout(mut self, timeout: Duration) -> Self {
        self.final_flush_timeout = timeout;
        self
    }

    pub fn buffer(&self) -> &Repository {
        &self.buffer
    }

    /// Merges one collector batch: gauges overwrite, counters accumulate.
    pub fn absorb(&self, batch: &[Metric]) {
        for metric in batch {
            if let Err(e) = self.buffer.update_metric(metric) {
                tracing::warn!(id = %metric.id, error = %e, "Dropping malformed metric");
            }
        }
    }

    /// Sends the current snapshot; a failed delivery is logged and dropped.
    pub async fn flush(&self) {
        let snapshot = self.buffer.to_metrics();
        if snapshot.is_empty() {
            return;
        }
        match self.transport.send(&snapshot).await {
            Ok(()) => tracing::debug!(
                transport = self.transport.name(),
                count = snapshot.len(),
                "Metrics reported"
            ),
            Err(e) => tracing::warn!(
                transport = self.transport.name(),
                count = snapshot.len(),
                error = format!("{e:#}"),
                "Failed to report metrics"
            ),
        }
    }

    /// Runs until `cancel` fires or every collector has hung up, then takes
    /// whatever is still queued and reports one last time.
    ///
    /// A report in flight is abandoned when `cancel` fires; the last report
    /// is bounded by the final flush timeout.
    pub async fn run(self, mut rx: mpsc::Receiver<Vec<Metric>>, cancel: CancellationToken) {
        let mut tick = interval_at(Instant::now() + self.report_interval, self.report_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            transport = self.transport.name(),
            interval_ms = self.report_interval.as_millis() as u64,
            "Sender started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tick.tick() => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = self.flush() => {}
                    }
                }
                batch = rx.recv() => match batch {
                    Some(batch) => self.absorb(&batch),
                    None => break,
                },
            }
        }

        rx.close();
        while let Ok(batch) = rx.try_recv() {
            self.absorb(&batch);
        }
        if tokio::time::timeout(self.final_flush_timeout, self.flush())
            .await
            .is_err()
        {
            tracing::warn!(
                timeout_ms = self.final_flush_timeout.as_millis() as u64,
                "Final report timed out"
            );
        }
        tracing::info!("Sender stopped");
    }
}

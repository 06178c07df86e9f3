use crate::PersistentStorage;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Saves `storage` every `interval` until `cancel` fires.
///
/// A zero interval returns immediately. Failed saves are logged and the
/// loop keeps running.
pub async fn run_saver(
    storage: Arc<dyn PersistentStorage>,
    interval: Duration,
    cancel: CancellationToken,
) {
    if interval.is_zero() {
        tracing::info!("Periodic snapshots disabled");
        return;
    }

    let mut tick = tokio::time::interval(interval);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // the first tick completes immediately
    tick.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tick.tick() => {
                match storage.save().await {
                    Ok(()) => tracing::debug!(backend = storage.backend(), "Periodic snapshot saved"),
                    Err(e) => tracing::error!(backend = storage.backend(), error = %e, "Periodic snapshot failed"),
                }
            }
        }
    }
    tracing::info!("Snapshot saver stopped");
}

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::MetricStore;

/// Handle for controlling the background expiry task.
pub struct SweepHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    join_handle: JoinHandle<()>,
}

impl SweepHandle {
    /// Signal the sweeper to stop and wait for it to finish.
    ///
    /// A sweep already in progress completes first.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = self.join_handle.await;
    }

    /// Abort the sweeper immediately.
    pub fn abort(self) {
        self.join_handle.abort();
    }
}

/// Start a task that calls [`MetricStore::evict_expired`] every `interval`.
///
/// The first sweep runs one interval after start. Ticks missed while a sweep
/// is slow are skipped rather than replayed.
pub fn start_expiry_sweeper(store: Arc<dyn MetricStore>, interval: Duration) -> SweepHandle {
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

    let join_handle = tokio::spawn(async move {
        tracing::info!(
            interval_secs = interval.as_secs(),
            "Starting expiry sweeper"
        );

        let start = tokio::time::Instant::now() + interval;
        let mut timer = tokio::time::interval_at(start, interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    let dropped = store.evict_expired().await;
                    if dropped > 0 {
                        let remaining = store.len().await;
                        tracing::info!(dropped, remaining, "Removed expired metrics");
                    }
                }
                _ = &mut shutdown_rx => {
                    tracing::info!("Expiry sweeper stopping");
                    break;
                }
            }
        }
    });

    SweepHandle {
        shutdown_tx: Some(shutdown_tx),
        join_handle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::test_fixtures::{sample, T0};
    use chrono::Utc;

    fn minute_expiry_store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new(100, Duration::from_secs(60)))
    }

    #[tokio::test(start_paused = true)]
    async fn sweeps_on_interval() {
        let store = minute_expiry_store();
        store
            .write(vec![
                sample("a", "stale", T0),
                sample("a", "fresh", Utc::now().timestamp_millis()),
            ])
            .await;

        let handle = start_expiry_sweeper(store.clone(), Duration::from_secs(1));

        // Nothing happens before the first interval elapses
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(store.len().await, 2);

        tokio::time::sleep(Duration::from_secs(1)).await;
        let remaining = store.query_latest(10).await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, "fresh");

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_sweeping_new_stale_samples() {
        let store = minute_expiry_store();
        let handle = start_expiry_sweeper(store.clone(), Duration::from_secs(1));

        for _ in 0..3 {
            store.write(vec![sample("a", "stale", T0)]).await;
            tokio::time::sleep(Duration::from_millis(1500)).await;
            assert!(store.is_empty().await);
        }

        handle.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn sweeps_on_worker_thread() {
        let store = minute_expiry_store();
        store.write(vec![sample("a", "stale", T0)]).await;

        let handle = start_expiry_sweeper(store.clone(), Duration::from_millis(20));
        tokio::time::timeout(Duration::from_secs(5), async {
            while !store.is_empty().await {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_sweeping() {
        let store = minute_expiry_store();
        let handle = start_expiry_sweeper(store.clone(), Duration::from_secs(1));
        handle.shutdown().await;

        store.write(vec![sample("a", "stale", T0)]).await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn abort_stops_sweeping() {
        let store = minute_expiry_store();
        let handle = start_expiry_sweeper(store.clone(), Duration::from_secs(1));
        handle.abort();
        tokio::task::yield_now().await;

        store.write(vec![sample("a", "stale", T0)]).await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(store.len().await, 1);
    }
}

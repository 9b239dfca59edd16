//! Background tickers driving the retry queue and health checks.

use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::coordinator::{DrainStep, SyncCoordinator};

/// Retry and health tickers owned by a [`SyncCoordinator`].
///
/// Tickers only hold a weak reference, so dropping the coordinator ends them.
/// A tick that has started always runs to completion; cancellation is only
/// observed between ticks.
pub struct Scheduler {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Spawn both tickers on the current runtime.
    pub fn spawn(coordinator: &Arc<SyncCoordinator>) -> Self {
        let cancel = CancellationToken::new();
        let settings = coordinator.settings();

        let retry = spawn_ticker(
            "retry",
            Arc::downgrade(coordinator),
            settings.retry_interval,
            cancel.clone(),
            |coordinator| async move {
                if let DrainStep::Busy = coordinator.drain_once().await {
                    tracing::trace!("Retry tick skipped; drain in flight");
                }
            },
        );

        let health = spawn_ticker(
            "health",
            Arc::downgrade(coordinator),
            settings.health_interval,
            cancel.clone(),
            |coordinator| async move {
                if let Some(report) = coordinator.auto_sync().await {
                    tracing::debug!(
                        flushed = report.flush.flushed,
                        collections = report.collections.len(),
                        "Auto-sync finished"
                    );
                }
            },
        );

        tracing::info!(
            retry_interval_secs = settings.retry_interval.as_secs(),
            health_interval_secs = settings.health_interval.as_secs(),
            "Sync scheduler started"
        );

        Self {
            cancel,
            handles: vec![retry, health],
        }
    }

    /// Stop both tickers and wait for them to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        for handle in std::mem::take(&mut self.handles) {
            if let Err(error) = handle.await {
                tracing::warn!(%error, "Sync ticker ended abnormally");
            }
        }
        tracing::info!("Sync scheduler stopped");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn spawn_ticker<F, Fut>(
    name: &'static str,
    coordinator: Weak<SyncCoordinator>,
    period: Duration,
    cancel: CancellationToken,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut(Arc<SyncCoordinator>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            let Some(coordinator) = coordinator.upgrade() else {
                break;
            };
            tick(coordinator).await;
        }

        tracing::debug!(ticker = name, "Sync ticker exited");
    })
}

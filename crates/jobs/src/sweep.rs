//! Background sweep loop.
//!
//! [`spawn`] starts a long-lived task that calls
//! [`JobTracker::sweep`] once immediately and then on a fixed interval
//! using `tokio::time::interval`. The returned [`SweepHandle`] stops
//! future sweeps; a sweep already in progress runs to completion,
//! including its persistence write.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::tracker::JobTracker;

/// Lower bound on the sweep interval; `tokio::time::interval` rejects zero.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

/// Handle to a running sweep loop.
#[derive(Debug)]
pub struct SweepHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SweepHandle {
    /// Stop scheduling further sweeps. Idempotent.
    pub fn terminate(&self) {
        if !self.cancel.is_cancelled() {
            tracing::info!("Terminating job sweep");
        }
        self.cancel.cancel();
    }

    pub fn is_terminated(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Terminate and wait for the loop task to exit. Waits for an
    /// in-flight sweep to finish.
    pub async fn join(self) {
        self.terminate();
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Job sweep task panicked");
        }
    }
}

/// Spawn the sweep loop for `tracker`.
pub fn spawn(tracker: Arc<JobTracker>, interval: Duration) -> SweepHandle {
    let cancel = CancellationToken::new();
    let task = tokio::spawn(run(tracker, interval, cancel.clone()));
    SweepHandle { cancel, task }
}

/// Run sweeps until `cancel` is triggered.
pub async fn run(tracker: Arc<JobTracker>, interval: Duration, cancel: CancellationToken) {
    let interval = interval.max(MIN_SWEEP_INTERVAL);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        interval_ms = interval.as_millis() as u64,
        ttl_secs = tracker.config().job_ttl.as_secs(),
        "Job sweep started",
    );

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("Job sweep stopping");
                break;
            }
            _ = ticker.tick() => {
                tracker.sweep().await;
            }
        }
    }
}

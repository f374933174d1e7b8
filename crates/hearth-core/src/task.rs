//! A spawned periodic loop plus the signal that stops it.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::warn;

/// Handle to a running loop task. Dropping it aborts the task.
#[derive(Debug)]
pub(crate) struct LoopTask {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl LoopTask {
    /// Spawn `body` with a receiver that flips to `true` when the loop
    /// should exit.
    pub(crate) fn spawn<F, Fut>(body: F) -> Self
    where
        F: FnOnce(watch::Receiver<bool>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (stop, stop_rx) = watch::channel(false);
        let task = tokio::spawn(body(stop_rx));
        Self { stop, task }
    }

    /// Signal the loop and wait for it to exit. A firing already in
    /// progress runs to completion first.
    pub(crate) async fn stop(mut self, name: &'static str) {
        let _ = self.stop.send(true);
        if let Err(err) = (&mut self.task).await {
            if !err.is_cancelled() {
                warn!(task = name, error = %err, "loop task ended abnormally");
            }
        }
    }
}

impl Drop for LoopTask {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// An interval whose first firing is one full `period` from now. Periods
/// under a millisecond are raised to one.
pub(crate) fn interval_after(period: Duration, missed: MissedTickBehavior) -> Interval {
    let period = period.max(Duration::from_millis(1));
    let now = Instant::now();
    let start = now.checked_add(period).unwrap_or(now);
    let mut interval = tokio::time::interval_at(start, period);
    interval.set_missed_tick_behavior(missed);
    interval
}

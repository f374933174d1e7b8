//! The real-time driver: the short fixed-period loop that advances
//! time-based effects between world ticks.
//!
//! Each firing sends one real-time pass to the effect actor. The driver
//! never counts durations down; that stays on the game tick.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::effects::EffectHandle;
use crate::task::{LoopTask, interval_after};

/// Self-scheduling loop for the real-time effect pass.
#[derive(Debug)]
pub struct RealTimeDriver {
    effects: EffectHandle,
    period: Duration,
    running: Mutex<Option<LoopTask>>,
}

impl RealTimeDriver {
    /// Create a stopped driver.
    pub fn new(effects: EffectHandle, period: Duration) -> Self {
        Self {
            effects,
            period,
            running: Mutex::new(None),
        }
    }

    /// The loop period.
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Start the loop. Returns `false` if it was already running.
    pub async fn start(&self) -> bool {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return false;
        }
        let effects = self.effects.clone();
        let period = self.period;
        *running = Some(LoopTask::spawn(move |stop| real_time_loop(effects, period, stop)));
        info!(period_ms = period.as_millis(), "real-time driver started");
        true
    }

    /// Stop the loop and wait for it to exit. Returns `false` if it was not
    /// running.
    pub async fn stop(&self) -> bool {
        let mut running = self.running.lock().await;
        let Some(task) = running.take() else {
            return false;
        };
        task.stop("real-time driver").await;
        info!("real-time driver stopped");
        true
    }

    /// Whether the loop is running.
    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }
}

async fn real_time_loop(
    effects: EffectHandle,
    period: Duration,
    mut stop: tokio::sync::watch::Receiver<bool>,
) {
    let mut interval = interval_after(period, MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            biased;
            _ = stop.changed() => break,
            _ = interval.tick() => {
                if effects.is_closed() {
                    debug!("effect actor closed, real-time driver exiting");
                    break;
                }
                let applied = effects.process_real_time_effects().await;
                if applied > 0 {
                    debug!(applied, "real-time pass");
                }
            }
        }
    }
}

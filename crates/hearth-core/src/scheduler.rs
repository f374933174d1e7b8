//! The world tick scheduler.
//!
//! Drives the discrete game clock. On every firing, in order:
//!
//! 1. advance the tick counter
//! 2. run the global combat round, then per-room combat (failures are
//!    logged, the tick continues)
//! 3. run the effect tick pass
//! 4. when the tick lands on the save interval, start the save pass
//!
//! The save pass runs on the blocking pool and is not awaited by the tick
//! loop, so a slow or failing store never delays or stops ticking.
//!
//! The scheduler is a two-state machine, stopped or running. [`start`] and
//! [`stop`] are idempotent, and once [`stop`] returns no further firing
//! happens. Settings live in atomics so status reads never wait on the
//! loop.
//!
//! [`start`]: TickScheduler::start
//! [`stop`]: TickScheduler::stop

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use hearth_effects::{PortError, RoomStore, SessionStore};
use serde::Serialize;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::clock::{ClockError, TickClock, is_due};
use crate::combat::CombatSystem;
use crate::config::{TickerConfig, TickerConfigUpdate};
use crate::effects::EffectHandle;
use crate::events::EngineEvent;
use crate::task::{LoopTask, interval_after};

/// Errors surfaced to administrative callers of the scheduler.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The tick counter could not advance.
    #[error("tick failed: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// A store failed to save.
    #[error("save failed: {source}")]
    Save {
        /// The underlying store error.
        #[from]
        source: PortError,
    },

    /// The blocking save task panicked or was cancelled.
    #[error("save task did not complete: {reason}")]
    SaveTask {
        /// Description of the join failure.
        reason: String,
    },
}

/// Snapshot of the scheduler for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchedulerStatus {
    /// Whether the tick loop is running.
    pub running: bool,
    /// The most recent tick.
    pub tick: u64,
    /// Milliseconds between ticks.
    pub tick_interval_ms: u64,
    /// Ticks between saves.
    pub save_interval: u64,
}

/// Everything the tick body needs, shared with the loop task.
struct TickContext {
    clock: TickClock,
    tick_interval_ms: AtomicU64,
    save_interval: AtomicU64,
    effects: EffectHandle,
    combat: Arc<dyn CombatSystem>,
    sessions: Arc<dyn SessionStore>,
    rooms: Arc<dyn RoomStore>,
    events: broadcast::Sender<EngineEvent>,
}

impl TickContext {
    fn config(&self) -> TickerConfig {
        TickerConfig {
            tick_interval_ms: self.tick_interval_ms.load(Ordering::Acquire),
            save_interval: self.save_interval.load(Ordering::Acquire),
        }
    }

    /// One full tick body. Returns the tick number that ran.
    async fn run_tick(self: &Arc<Self>) -> Result<u64, SchedulerError> {
        let tick = self.clock.advance()?;

        if let Err(err) = self.combat.process_combat_round() {
            warn!(tick, error = %err, "combat round failed");
        }
        if let Err(err) = self.combat.process_room_combat() {
            warn!(tick, error = %err, "room combat failed");
        }

        let summary = self.effects.process_game_tick(tick).await;
        let _ = self.events.send(EngineEvent::Tick { tick });

        let save_interval = self.save_interval.load(Ordering::Acquire);
        let saving = is_due(tick, save_interval);
        debug!(
            tick,
            effects_applied = summary.applied,
            effects_expired = summary.expired,
            saving,
            "tick complete"
        );

        if saving {
            let ctx = Arc::clone(self);
            // Detached: the loop never waits on persistence.
            drop(tokio::task::spawn_blocking(move || {
                if let Err(err) = ctx.save_all(tick) {
                    error!(tick, error = %err, "periodic save failed");
                }
            }));
        }
        Ok(tick)
    }

    /// Flush both stores. Blocking.
    fn save_all(&self, tick: u64) -> Result<(), PortError> {
        self.sessions.force_save()?;
        self.rooms.force_save()?;
        info!(tick, "world state saved");
        let _ = self.events.send(EngineEvent::Saved { tick });
        Ok(())
    }
}

/// The world tick scheduler.
pub struct TickScheduler {
    ctx: Arc<TickContext>,
    running: Mutex<Option<LoopTask>>,
    running_flag: AtomicBool,
}

impl core::fmt::Debug for TickScheduler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TickScheduler")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl TickScheduler {
    /// Create a stopped scheduler at tick 0.
    pub fn new(
        config: TickerConfig,
        effects: EffectHandle,
        combat: Arc<dyn CombatSystem>,
        sessions: Arc<dyn SessionStore>,
        rooms: Arc<dyn RoomStore>,
        events: broadcast::Sender<EngineEvent>,
    ) -> Self {
        Self {
            ctx: Arc::new(TickContext {
                clock: TickClock::new(),
                tick_interval_ms: AtomicU64::new(config.tick_interval_ms),
                save_interval: AtomicU64::new(config.save_interval),
                effects,
                combat,
                sessions,
                rooms,
                events,
            }),
            running: Mutex::new(None),
            running_flag: AtomicBool::new(false),
        }
    }

    /// Start ticking. The first tick fires one full interval from now.
    /// Returns `false` if already running.
    pub async fn start(&self) -> bool {
        let mut running = self.running.lock().await;
        if running.is_some() {
            debug!("tick scheduler already running");
            return false;
        }
        self.spawn_locked(&mut running);
        true
    }

    /// Stop ticking and wait for the loop to exit. A tick in progress
    /// completes first. Returns `false` if already stopped.
    pub async fn stop(&self) -> bool {
        let mut running = self.running.lock().await;
        self.stop_locked(&mut running).await
    }

    /// Merge new settings. A running scheduler restarts so a new interval
    /// takes effect immediately. Returns the resulting settings.
    ///
    /// The restart holds the run lock throughout, so a concurrent `stop`
    /// lands either before the update or after the restart.
    pub async fn update_config(&self, update: TickerConfigUpdate) -> TickerConfig {
        let mut running = self.running.lock().await;
        let merged = self.ctx.config().merged(update);
        self.ctx
            .tick_interval_ms
            .store(merged.tick_interval_ms, Ordering::Release);
        self.ctx
            .save_interval
            .store(merged.save_interval, Ordering::Release);
        info!(
            tick_interval_ms = merged.tick_interval_ms,
            save_interval = merged.save_interval,
            "ticker config updated"
        );

        if self.stop_locked(&mut running).await {
            self.spawn_locked(&mut running);
        }
        merged
    }

    fn spawn_locked(&self, running: &mut Option<LoopTask>) {
        let config = self.ctx.config();
        let ctx = Arc::clone(&self.ctx);
        let period = Duration::from_millis(config.tick_interval_ms);
        *running = Some(LoopTask::spawn(move |stop| tick_loop(ctx, period, stop)));
        self.running_flag.store(true, Ordering::Release);
        info!(
            tick_interval_ms = config.tick_interval_ms,
            save_interval = config.save_interval,
            tick = self.ctx.clock.tick(),
            "tick scheduler started"
        );
    }

    async fn stop_locked(&self, running: &mut Option<LoopTask>) -> bool {
        let Some(task) = running.take() else {
            return false;
        };
        task.stop("tick scheduler").await;
        self.running_flag.store(false, Ordering::Release);
        info!(tick = self.ctx.clock.tick(), "tick scheduler stopped");
        true
    }

    /// Run one tick body now, outside the timer. The save interval is
    /// honored.
    pub async fn force_tick(&self) -> Result<u64, SchedulerError> {
        let tick = self.ctx.run_tick().await?;
        info!(tick, "forced tick");
        Ok(tick)
    }

    /// Save both stores now and report the outcome.
    pub async fn force_save(&self) -> Result<(), SchedulerError> {
        let ctx = Arc::clone(&self.ctx);
        let tick = ctx.clock.tick();
        tokio::task::spawn_blocking(move || ctx.save_all(tick))
            .await
            .map_err(|err| SchedulerError::SaveTask {
                reason: err.to_string(),
            })??;
        Ok(())
    }

    /// Current settings.
    pub fn config(&self) -> TickerConfig {
        self.ctx.config()
    }

    /// The most recent tick.
    pub fn tick_count(&self) -> u64 {
        self.ctx.clock.tick()
    }

    /// Whether the tick loop is running.
    pub fn is_running(&self) -> bool {
        self.running_flag.load(Ordering::Acquire)
    }

    /// Snapshot for status reporting.
    pub fn status(&self) -> SchedulerStatus {
        let config = self.config();
        SchedulerStatus {
            running: self.is_running(),
            tick: self.tick_count(),
            tick_interval_ms: config.tick_interval_ms,
            save_interval: config.save_interval,
        }
    }
}

async fn tick_loop(ctx: Arc<TickContext>, period: Duration, mut stop: watch::Receiver<bool>) {
    let mut interval = interval_after(period, MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            _ = stop.changed() => break,
            _ = interval.tick() => {
                if let Err(err) = ctx.run_tick().await {
                    error!(error = %err, "tick failed");
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hearth_effects::{
        DEFAULT_UNCONSCIOUS_THRESHOLD, EffectApplier, EffectRegistry, MemoryRoomStore,
        MemorySessionStore, StackingTable,
    };

    use super::*;
    use crate::combat::IdleCombat;
    use crate::effects::EffectActor;

    struct Rig {
        scheduler: TickScheduler,
        sessions: Arc<MemorySessionStore>,
        rooms: Arc<MemoryRoomStore>,
    }

    fn rig(config: TickerConfig) -> Rig {
        let sessions = Arc::new(MemorySessionStore::new());
        let rooms = Arc::new(MemoryRoomStore::new());
        let applier = EffectApplier::new(
            Arc::clone(&sessions) as Arc<dyn SessionStore>,
            Arc::clone(&rooms) as Arc<dyn RoomStore>,
            DEFAULT_UNCONSCIOUS_THRESHOLD,
        );
        let events = crate::events::channel();
        let (actor, effects) = EffectActor::new(
            EffectRegistry::new(applier, StackingTable::default()),
            16,
            events.clone(),
        );
        drop(actor.spawn());
        let scheduler = TickScheduler::new(
            config,
            effects,
            Arc::new(IdleCombat),
            Arc::clone(&sessions) as Arc<dyn SessionStore>,
            Arc::clone(&rooms) as Arc<dyn RoomStore>,
            events,
        );
        Rig {
            scheduler,
            sessions,
            rooms,
        }
    }

    fn ticker(tick_interval_ms: u64, save_interval: u64) -> TickerConfig {
        TickerConfig {
            tick_interval_ms,
            save_interval,
        }
    }

    #[tokio::test]
    async fn start_and_stop_are_idempotent() {
        let rig = rig(ticker(1_000, 10));
        assert!(!rig.scheduler.is_running());
        assert!(!rig.scheduler.stop().await);
        assert!(rig.scheduler.start().await);
        assert!(!rig.scheduler.start().await);
        assert!(rig.scheduler.is_running());
        assert!(rig.scheduler.stop().await);
        assert!(!rig.scheduler.stop().await);
        assert!(!rig.scheduler.is_running());
    }

    #[tokio::test]
    async fn forced_ticks_advance_the_counter() {
        let rig = rig(ticker(1_000, 10));
        assert_eq!(rig.scheduler.force_tick().await.unwrap(), 1);
        assert_eq!(rig.scheduler.force_tick().await.unwrap(), 2);
        assert_eq!(rig.scheduler.tick_count(), 2);
        assert!(!rig.scheduler.is_running());
    }

    #[tokio::test]
    async fn force_save_reports_failures() {
        let rig = rig(ticker(1_000, 10));
        rig.scheduler.force_save().await.unwrap();
        assert_eq!(rig.sessions.save_count(), 1);
        assert_eq!(rig.rooms.save_count(), 1);

        rig.rooms.set_fail_saves(true);
        assert!(matches!(
            rig.scheduler.force_save().await,
            Err(SchedulerError::Save { .. })
        ));
    }

    #[tokio::test]
    async fn update_merges_settings_while_stopped() {
        let rig = rig(ticker(6_000, 10));
        let merged = rig
            .scheduler
            .update_config(TickerConfigUpdate {
                tick_interval_ms: None,
                save_interval: Some(3),
            })
            .await;
        assert_eq!(merged, ticker(6_000, 3));
        assert_eq!(rig.scheduler.config(), merged);
        assert!(!rig.scheduler.is_running());
    }

    #[tokio::test]
    async fn stop_during_a_restart_is_not_undone() {
        let rig = rig(ticker(6_000, 10));
        assert!(rig.scheduler.start().await);

        let (merged, stopped) = tokio::join!(
            rig.scheduler.update_config(TickerConfigUpdate {
                tick_interval_ms: Some(2_000),
                save_interval: None,
            }),
            rig.scheduler.stop(),
        );
        assert_eq!(merged, ticker(2_000, 10));
        assert!(stopped);
        assert!(!rig.scheduler.is_running());
        assert!(!rig.scheduler.stop().await);
    }

    #[tokio::test]
    async fn status_reflects_state() {
        let rig = rig(ticker(2_000, 5));
        let _ = rig.scheduler.force_tick().await.unwrap();
        let status = rig.scheduler.status();
        assert_eq!(
            status,
            SchedulerStatus {
                running: false,
                tick: 1,
                tick_interval_ms: 2_000,
                save_interval: 5,
            }
        );
        let json = serde_json::to_value(status).unwrap();
        assert_eq!(json["tick"], 1);
    }
}

//! Composition root: builds the effect actor, real-time driver, and tick
//! scheduler from one configuration and a set of collaborators.
//!
//! A [`WorldRuntime`] is created explicitly and passed around by reference.
//! Dropping it aborts every task it spawned, so no loop keeps mutating
//! state after the world is torn down.

use std::sync::Arc;
use std::time::Duration;

use hearth_effects::{EffectApplier, EffectRegistry, RoomStore, SessionStore};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;

use crate::combat::CombatSystem;
use crate::config::EngineConfig;
use crate::effects::{EffectActor, EffectHandle};
use crate::events::{self, EngineEvent};
use crate::realtime::RealTimeDriver;
use crate::scheduler::TickScheduler;

/// A running effect engine plus its (initially stopped) tick scheduler.
#[derive(Debug)]
pub struct WorldRuntime {
    config: EngineConfig,
    effects: EffectHandle,
    actor: JoinHandle<()>,
    realtime: RealTimeDriver,
    scheduler: TickScheduler,
    events: broadcast::Sender<EngineEvent>,
}

impl WorldRuntime {
    /// Spawn the effect actor, start the real-time driver, and build a
    /// stopped tick scheduler. Must be called inside a tokio runtime.
    pub async fn new(
        config: EngineConfig,
        sessions: Arc<dyn SessionStore>,
        rooms: Arc<dyn RoomStore>,
        combat: Arc<dyn CombatSystem>,
    ) -> Self {
        let events = events::channel();

        let applier = EffectApplier::new(
            Arc::clone(&sessions),
            Arc::clone(&rooms),
            config.effects.unconscious_threshold,
        );
        let registry = EffectRegistry::new(applier, config.effects.stacking_table());
        let (actor, effects) =
            EffectActor::new(registry, config.effects.command_buffer, events.clone());
        let actor = actor.spawn();

        let realtime = RealTimeDriver::new(
            effects.clone(),
            Duration::from_millis(config.effects.real_time_interval_ms),
        );
        realtime.start().await;

        let scheduler = TickScheduler::new(
            config.ticker,
            effects.clone(),
            combat,
            sessions,
            rooms,
            events.clone(),
        );

        info!(
            tick_interval_ms = config.ticker.tick_interval_ms,
            save_interval = config.ticker.save_interval,
            real_time_interval_ms = config.effects.real_time_interval_ms,
            "world runtime ready"
        );

        Self {
            config,
            effects,
            actor,
            realtime,
            scheduler,
            events,
        }
    }

    /// The configuration the runtime was built from.
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Handle to the effect actor.
    pub const fn effects(&self) -> &EffectHandle {
        &self.effects
    }

    /// The tick scheduler.
    pub const fn scheduler(&self) -> &TickScheduler {
        &self.scheduler
    }

    /// The real-time driver.
    pub const fn realtime(&self) -> &RealTimeDriver {
        &self.realtime
    }

    /// Subscribe to engine events.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Stop the scheduler and the real-time driver, then close the effect
    /// actor and wait for it to finish.
    pub async fn shutdown(mut self) {
        self.scheduler.stop().await;
        self.realtime.stop().await;
        self.effects.shutdown().await;
        let _ = (&mut self.actor).await;
        info!(tick = self.scheduler.tick_count(), "world runtime shut down");
    }
}

impl Drop for WorldRuntime {
    fn drop(&mut self) {
        self.actor.abort();
    }
}

//! The effect actor: one task that owns the [`EffectRegistry`] and
//! serializes every operation on it.
//!
//! Both clocks and every caller talk to the registry through an
//! [`EffectHandle`], which sends [`EffectCommand`]s over a bounded queue and
//! awaits the reply on a oneshot channel. Because the actor handles one
//! command at a time, a tick pass, a real-time pass, and an add can never
//! interleave on the same effect.
//!
//! Events drained from the registry after each command are forwarded to the
//! engine event channel.

use std::collections::BTreeMap;

use hearth_effects::{ActiveEffect, EffectRegistry, TickPassSummary};
use hearth_types::{ActionKind, EffectId, EffectSpec, EffectTarget, EffectType};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::events::EngineEvent;

/// A request to the effect actor.
#[derive(Debug)]
pub enum EffectCommand {
    /// Add an effect to a target.
    Add {
        /// The target to affect.
        target: EffectTarget,
        /// The effect to build.
        spec: Box<EffectSpec>,
        /// Receives the inserted effect, or `None` if it was discarded.
        reply: oneshot::Sender<Option<ActiveEffect>>,
    },
    /// Remove one effect by id.
    Remove {
        /// The effect to remove.
        id: EffectId,
        /// Receives whether anything was removed.
        reply: oneshot::Sender<bool>,
    },
    /// Remove every effect on a target.
    RemoveForTarget {
        /// The target to clear.
        target: EffectTarget,
        /// Receives how many effects were removed.
        reply: oneshot::Sender<usize>,
    },
    /// Snapshot the effects on a target.
    EffectsFor {
        /// The target to inspect.
        target: EffectTarget,
        /// Receives the effects in registration order.
        reply: oneshot::Sender<Vec<ActiveEffect>>,
    },
    /// Sum the stat modifiers on a target.
    StatModifiers {
        /// The target to inspect.
        target: EffectTarget,
        /// Receives stat name to summed delta.
        reply: oneshot::Sender<BTreeMap<String, i32>>,
    },
    /// Check whether an action is blocked.
    IsActionBlocked {
        /// The target to inspect.
        target: EffectTarget,
        /// The action being attempted.
        action: ActionKind,
        /// Receives whether any effect blocks it.
        reply: oneshot::Sender<bool>,
    },
    /// Check for an effect type on a target.
    HasEffectType {
        /// The target to inspect.
        target: EffectTarget,
        /// The type to look for.
        effect_type: EffectType,
        /// Receives whether the target holds one.
        reply: oneshot::Sender<bool>,
    },
    /// Run the game-tick pass.
    GameTick {
        /// The tick being processed.
        tick: u64,
        /// Receives the pass summary.
        reply: oneshot::Sender<TickPassSummary>,
    },
    /// Run the real-time pass at the current instant.
    RealTimePass {
        /// Receives the number of payloads applied.
        reply: oneshot::Sender<usize>,
    },
    /// Count every active effect.
    Count {
        /// Receives the count.
        reply: oneshot::Sender<usize>,
    },
    /// List every target holding effects.
    Targets {
        /// Receives the targets, players first.
        reply: oneshot::Sender<Vec<EffectTarget>>,
    },
    /// Stop the actor after draining nothing further.
    Shutdown,
}

/// Cloneable handle to the effect actor.
///
/// When the actor has stopped, every query returns an empty result and
/// every mutation is a no-op; both log a warning.
#[derive(Debug, Clone)]
pub struct EffectHandle {
    tx: mpsc::Sender<EffectCommand>,
}

impl EffectHandle {
    async fn request<T: Default>(
        &self,
        op: &'static str,
        make: impl FnOnce(oneshot::Sender<T>) -> EffectCommand,
    ) -> T {
        let (reply, response) = oneshot::channel();
        if self.tx.send(make(reply)).await.is_err() {
            warn!(op, "effect actor is closed");
            return T::default();
        }
        response.await.unwrap_or_else(|_| {
            warn!(op, "effect actor dropped the reply");
            T::default()
        })
    }

    /// Add an effect built from `spec` to `target`.
    pub async fn add_effect(&self, target: EffectTarget, spec: EffectSpec) -> Option<ActiveEffect> {
        let spec = Box::new(spec);
        self.request("add_effect", |reply| EffectCommand::Add {
            target,
            spec,
            reply,
        })
        .await
    }

    /// Remove an effect by id.
    pub async fn remove_effect(&self, id: EffectId) -> bool {
        self.request("remove_effect", |reply| EffectCommand::Remove { id, reply })
            .await
    }

    /// Remove every effect on a target.
    pub async fn remove_effects_for_target(&self, target: EffectTarget) -> usize {
        self.request("remove_effects_for_target", |reply| {
            EffectCommand::RemoveForTarget { target, reply }
        })
        .await
    }

    /// Effects on a target in registration order.
    pub async fn effects_for_target(&self, target: EffectTarget) -> Vec<ActiveEffect> {
        self.request("effects_for_target", |reply| EffectCommand::EffectsFor {
            target,
            reply,
        })
        .await
    }

    /// Summed stat modifiers on a target.
    pub async fn stat_modifiers(&self, target: EffectTarget) -> BTreeMap<String, i32> {
        self.request("stat_modifiers", |reply| EffectCommand::StatModifiers {
            target,
            reply,
        })
        .await
    }

    /// Whether any effect on the target blocks `action`.
    pub async fn is_action_blocked(&self, target: EffectTarget, action: ActionKind) -> bool {
        self.request("is_action_blocked", |reply| EffectCommand::IsActionBlocked {
            target,
            action,
            reply,
        })
        .await
    }

    /// Whether the target holds an effect of `effect_type`.
    pub async fn has_effect_type(&self, target: EffectTarget, effect_type: EffectType) -> bool {
        self.request("has_effect_type", |reply| EffectCommand::HasEffectType {
            target,
            effect_type,
            reply,
        })
        .await
    }

    /// Run the game-tick pass for `tick`.
    pub async fn process_game_tick(&self, tick: u64) -> TickPassSummary {
        self.request("process_game_tick", |reply| EffectCommand::GameTick { tick, reply })
            .await
    }

    /// Run the real-time pass now.
    pub async fn process_real_time_effects(&self) -> usize {
        self.request("process_real_time_effects", |reply| {
            EffectCommand::RealTimePass { reply }
        })
        .await
    }

    /// Total number of active effects.
    pub async fn effect_count(&self) -> usize {
        self.request("effect_count", |reply| EffectCommand::Count { reply })
            .await
    }

    /// Every target holding effects.
    pub async fn targets(&self) -> Vec<EffectTarget> {
        self.request("targets", |reply| EffectCommand::Targets { reply })
            .await
    }

    /// Ask the actor to stop. Commands already queued are still handled.
    pub async fn shutdown(&self) {
        if self.tx.send(EffectCommand::Shutdown).await.is_err() {
            debug!("effect actor already closed");
        }
    }

    /// Whether the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The task that owns the registry.
#[derive(Debug)]
pub struct EffectActor {
    registry: EffectRegistry,
    rx: mpsc::Receiver<EffectCommand>,
    events: broadcast::Sender<EngineEvent>,
}

impl EffectActor {
    /// Create an actor and the handle that feeds it. `buffer` is raised to
    /// at least 1.
    pub fn new(
        registry: EffectRegistry,
        buffer: usize,
        events: broadcast::Sender<EngineEvent>,
    ) -> (Self, EffectHandle) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (
            Self {
                registry,
                rx,
                events,
            },
            EffectHandle { tx },
        )
    }

    /// Spawn the actor onto the current runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Handle commands until shut down or every handle is dropped.
    pub async fn run(mut self) {
        info!("effect actor started");
        while let Some(cmd) = self.rx.recv().await {
            let keep_running = self.handle(cmd);
            self.publish();
            if !keep_running {
                break;
            }
        }
        info!(remaining = self.registry.effect_count(), "effect actor stopped");
    }

    fn handle(&mut self, cmd: EffectCommand) -> bool {
        // A dropped reply receiver means the caller gave up; nothing to do.
        match cmd {
            EffectCommand::Add {
                target,
                spec,
                reply,
            } => {
                let now = tokio::time::Instant::now().into_std();
                let _ = reply.send(self.registry.add_effect(target, *spec, now));
            }
            EffectCommand::Remove { id, reply } => {
                let _ = reply.send(self.registry.remove_effect(id));
            }
            EffectCommand::RemoveForTarget { target, reply } => {
                let _ = reply.send(self.registry.remove_effects_for_target(&target));
            }
            EffectCommand::EffectsFor { target, reply } => {
                let _ = reply.send(self.registry.effects_for_target(&target).to_vec());
            }
            EffectCommand::StatModifiers { target, reply } => {
                let _ = reply.send(self.registry.stat_modifiers(&target));
            }
            EffectCommand::IsActionBlocked {
                target,
                action,
                reply,
            } => {
                let _ = reply.send(self.registry.is_action_blocked(&target, action));
            }
            EffectCommand::HasEffectType {
                target,
                effect_type,
                reply,
            } => {
                let _ = reply.send(self.registry.has_effect_type(&target, effect_type));
            }
            EffectCommand::GameTick { tick, reply } => {
                let summary = self.registry.process_game_tick(tick);
                debug!(
                    tick,
                    applied = summary.applied,
                    expired = summary.expired,
                    "effect tick pass"
                );
                let _ = reply.send(summary);
            }
            EffectCommand::RealTimePass { reply } => {
                let now = tokio::time::Instant::now().into_std();
                let _ = reply.send(self.registry.process_real_time_effects(now));
            }
            EffectCommand::Count { reply } => {
                let _ = reply.send(self.registry.effect_count());
            }
            EffectCommand::Targets { reply } => {
                let _ = reply.send(self.registry.targets());
            }
            EffectCommand::Shutdown => return false,
        }
        true
    }

    fn publish(&mut self) {
        for event in self.registry.drain_events() {
            // No subscribers is fine.
            let _ = self.events.send(EngineEvent::Effect(event));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use hearth_effects::{
        DEFAULT_UNCONSCIOUS_THRESHOLD, EffectApplier, MemoryRoomStore, MemorySessionStore,
        RoomStore, SessionStore, StackingTable,
    };
    use hearth_types::{EffectPayload, PlayerVitals};

    use super::*;

    fn spawn_actor() -> (EffectHandle, JoinHandle<()>, Arc<MemorySessionStore>) {
        let sessions = Arc::new(MemorySessionStore::new());
        let rooms = Arc::new(MemoryRoomStore::new());
        rooms.add_room("square");
        sessions.login(PlayerVitals {
            username: "ann".to_owned(),
            health: 100,
            max_health: 100,
            unconscious: false,
            room_id: "square".to_owned(),
        });
        let applier = EffectApplier::new(
            Arc::clone(&sessions) as Arc<dyn SessionStore>,
            rooms as Arc<dyn RoomStore>,
            DEFAULT_UNCONSCIOUS_THRESHOLD,
        );
        let registry = EffectRegistry::new(applier, StackingTable::default());
        let (actor, handle) = EffectActor::new(registry, 8, crate::events::channel());
        (handle, actor.spawn(), sessions)
    }

    #[tokio::test]
    async fn add_query_remove_round_trip() {
        let (handle, _task, _sessions) = spawn_actor();
        let ann = EffectTarget::player("ann");
        let root = EffectSpec::new(EffectType::Root, "Snare", 3).with_payload(EffectPayload {
            block_movement: true,
            ..EffectPayload::default()
        });

        let effect = handle.add_effect(ann.clone(), root).await.unwrap();
        assert_eq!(handle.effect_count().await, 1);
        assert!(handle.is_action_blocked(ann.clone(), ActionKind::Movement).await);
        assert!(handle.has_effect_type(ann.clone(), EffectType::Root).await);
        assert_eq!(handle.targets().await, vec![ann.clone()]);

        assert!(handle.remove_effect(effect.id()).await);
        assert!(!handle.remove_effect(effect.id()).await);
        assert!(handle.effects_for_target(ann).await.is_empty());
    }

    #[tokio::test]
    async fn tick_pass_goes_through_the_actor() {
        let (handle, _task, sessions) = spawn_actor();
        let ann = EffectTarget::player("ann");
        let spec = EffectSpec::new(EffectType::DamageOverTime, "Hex", 3)
            .every_ticks(1)
            .with_payload(EffectPayload {
                damage_per_tick: Some(10),
                ..EffectPayload::default()
            });
        let _ = handle.add_effect(ann, spec).await;
        for tick in 1..=3 {
            let _ = handle.process_game_tick(tick).await;
        }
        assert_eq!(sessions.player("ann").unwrap().health, 70);
        assert_eq!(handle.effect_count().await, 0);
    }

    #[tokio::test]
    async fn closed_actor_degrades_to_defaults() {
        let (handle, task, _sessions) = spawn_actor();
        handle.shutdown().await;
        task.await.unwrap();
        assert!(handle.is_closed());

        let spec = EffectSpec::new(EffectType::Stun, "Dazed", 2);
        assert!(handle.add_effect(EffectTarget::player("ann"), spec).await.is_none());
        assert_eq!(handle.effect_count().await, 0);
        assert_eq!(handle.process_game_tick(1).await, TickPassSummary::default());
    }

    #[tokio::test]
    async fn events_are_forwarded() {
        let sessions = Arc::new(MemorySessionStore::new());
        let rooms = Arc::new(MemoryRoomStore::new());
        let applier = EffectApplier::new(
            sessions as Arc<dyn SessionStore>,
            rooms as Arc<dyn RoomStore>,
            DEFAULT_UNCONSCIOUS_THRESHOLD,
        );
        let events = crate::events::channel();
        let mut rx = events.subscribe();
        let (actor, handle) = EffectActor::new(
            EffectRegistry::new(applier, StackingTable::default()),
            8,
            events,
        );
        let _task = actor.spawn();

        let spec = EffectSpec::new(EffectType::Stun, "Dazed", 1);
        let _ = handle.add_effect(EffectTarget::npc("rat-1"), spec).await;
        let _ = handle.process_game_tick(1).await;

        assert!(matches!(
            rx.recv().await.unwrap(),
            EngineEvent::Effect(hearth_effects::EffectEvent::Added { effect: Some(_), .. })
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            EngineEvent::Effect(hearth_effects::EffectEvent::Removed { .. })
        ));
    }
}

//! The effect registry: every active effect in the world, partitioned by
//! target kind.
//!
//! The registry owns all [`ActiveEffect`]s. It resolves stacking on add,
//! routes every removal through one path (so the player always hears that an
//! effect wore off and an event is always emitted), and runs the two clock
//! passes:
//!
//! - [`EffectRegistry::process_game_tick`] counts every effect down by one,
//!   applies tick-gated payloads that are due, and removes what expired.
//! - [`EffectRegistry::process_real_time_effects`] applies time-based
//!   payloads whose wall-clock interval has elapsed. It never counts down
//!   and never removes.
//!
//! Iteration is deterministic: players before NPCs, each partition in id
//! order, each target's effects in registration order.

use std::collections::BTreeMap;
use std::time::Instant;

use hearth_types::{
    ActionKind, EffectId, EffectSpec, EffectTarget, EffectType, StackingBehavior,
};
use serde::Serialize;
use tracing::debug;

use crate::applier::EffectApplier;
use crate::effect::ActiveEffect;
use crate::events::EffectEvent;
use crate::stacking::{StackDecision, StackingTable, resolve};

type Partition = BTreeMap<String, Vec<ActiveEffect>>;

/// Result of one game-tick pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickPassSummary {
    /// The tick that was processed.
    pub tick: u64,
    /// Payloads applied during the pass.
    pub applied: usize,
    /// Effects that expired and were removed.
    pub expired: usize,
}

/// All active effects, keyed by target.
#[derive(Debug)]
pub struct EffectRegistry {
    players: Partition,
    npcs: Partition,
    stacking: StackingTable,
    applier: EffectApplier,
    last_tick: u64,
    outbox: Vec<EffectEvent>,
}

impl EffectRegistry {
    /// Create an empty registry.
    pub const fn new(applier: EffectApplier, stacking: StackingTable) -> Self {
        Self {
            players: BTreeMap::new(),
            npcs: BTreeMap::new(),
            stacking,
            applier,
            last_tick: 0,
            outbox: Vec::new(),
        }
    }

    /// The stacking defaults in use.
    pub const fn stacking(&self) -> &StackingTable {
        &self.stacking
    }

    /// The most recent tick passed to [`process_game_tick`](Self::process_game_tick).
    pub const fn last_tick(&self) -> u64 {
        self.last_tick
    }

    const fn partition(&self, target: &EffectTarget) -> &Partition {
        match target {
            EffectTarget::Player(_) => &self.players,
            EffectTarget::Npc(_) => &self.npcs,
        }
    }

    const fn partition_mut(&mut self, target: &EffectTarget) -> &mut Partition {
        match target {
            EffectTarget::Player(_) => &mut self.players,
            EffectTarget::Npc(_) => &mut self.npcs,
        }
    }

    // -----------------------------------------------------------------------
    // Add / remove
    // -----------------------------------------------------------------------

    /// Add an effect built from `spec` to `target`.
    ///
    /// Returns the inserted effect, or `None` when `spec` has no duration
    /// or stacking discarded it (including `StackDuration`, which folds the
    /// new duration into the existing effect instead).
    ///
    /// A tick-gated effect fires its payload once on insertion and then
    /// waits a full `tick_interval` before firing again. Time-based effects
    /// first fire one `real_time_interval_ms` after `now`.
    pub fn add_effect(
        &mut self,
        target: EffectTarget,
        spec: EffectSpec,
        now: Instant,
    ) -> Option<ActiveEffect> {
        if spec.duration_ticks == 0 {
            debug!(%target, effect = %spec.name, "zero-duration effect discarded");
            self.outbox.push(EffectEvent::Added {
                target,
                effect: None,
            });
            return None;
        }

        let behavior = self.stacking.behavior_for(&spec);
        let decision = {
            let existing: Vec<&ActiveEffect> = self
                .effects_for_target(&target)
                .iter()
                .filter(|e| e.effect_type() == spec.effect_type)
                .collect();
            resolve(behavior, &existing, &spec.payload)
        };

        match decision {
            StackDecision::Insert => {}
            StackDecision::Replace(ids) => {
                for id in ids {
                    self.remove_effect(id);
                }
            }
            StackDecision::Extend(id) => {
                if let Some(effect) = self
                    .partition_mut(&target)
                    .get_mut(target.id())
                    .and_then(|effects| effects.iter_mut().find(|e| e.id() == id))
                {
                    effect.extend(spec.duration_ticks);
                    debug!(
                        %target,
                        effect = effect.name(),
                        remaining_ticks = effect.remaining_ticks(),
                        "effect duration extended"
                    );
                }
                self.outbox.push(EffectEvent::Added {
                    target,
                    effect: None,
                });
                return None;
            }
            StackDecision::Discard => {
                debug!(%target, effect = %spec.name, ?behavior, "effect discarded by stacking");
                self.outbox.push(EffectEvent::Added {
                    target,
                    effect: None,
                });
                return None;
            }
        }

        Some(self.insert(target, spec, behavior, now))
    }

    fn insert(
        &mut self,
        target: EffectTarget,
        spec: EffectSpec,
        behavior: StackingBehavior,
        now: Instant,
    ) -> ActiveEffect {
        let mut effect = ActiveEffect::from_spec(target.clone(), spec, behavior, now);

        self.applier
            .notify(&target, &format!("You are affected by {}.", effect.name()));
        if effect.is_tick_gated() {
            let outcome = self.applier.apply(&effect);
            effect.mark_tick_applied(self.last_tick);
            debug!(%target, effect = effect.name(), ?outcome, "insertion payload fired");
        }

        debug!(
            %target,
            effect_id = %effect.id(),
            effect = effect.name(),
            effect_type = %effect.effect_type(),
            remaining_ticks = effect.remaining_ticks(),
            ?behavior,
            "effect added"
        );

        let key = target.id().to_owned();
        self.partition_mut(&target)
            .entry(key)
            .or_default()
            .push(effect.clone());
        self.outbox.push(EffectEvent::Added {
            target,
            effect: Some(effect.clone()),
        });
        effect
    }

    /// Remove an effect by id. Returns `false` if no such effect exists.
    pub fn remove_effect(&mut self, id: EffectId) -> bool {
        let Some(effect) = take(&mut self.players, id).or_else(|| take(&mut self.npcs, id)) else {
            return false;
        };

        self.applier
            .notify(effect.target(), &format!("{} has worn off.", effect.name()));
        debug!(
            target = %effect.target(),
            effect_id = %id,
            effect = effect.name(),
            "effect removed"
        );
        self.outbox.push(EffectEvent::Removed {
            target: effect.target().clone(),
            effect,
        });
        true
    }

    /// Remove every effect on one target. Returns how many were removed.
    pub fn remove_effects_for_target(&mut self, target: &EffectTarget) -> usize {
        let ids: Vec<EffectId> = self
            .effects_for_target(target)
            .iter()
            .map(ActiveEffect::id)
            .collect();
        ids.into_iter().filter(|id| self.remove_effect(*id)).count()
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Effects on a target in registration order.
    pub fn effects_for_target(&self, target: &EffectTarget) -> &[ActiveEffect] {
        self.partition(target)
            .get(target.id())
            .map_or(&[], Vec::as_slice)
    }

    /// Sum of every stat modifier across all effects on a target.
    pub fn stat_modifiers(&self, target: &EffectTarget) -> BTreeMap<String, i32> {
        let mut totals: BTreeMap<String, i32> = BTreeMap::new();
        for effect in self.effects_for_target(target) {
            for (stat, delta) in &effect.payload().stat_modifiers {
                let total = totals.entry(stat.clone()).or_insert(0);
                *total = total.saturating_add(*delta);
            }
        }
        totals
    }

    /// Whether any effect on the target blocks the given action.
    pub fn is_action_blocked(&self, target: &EffectTarget, action: ActionKind) -> bool {
        self.effects_for_target(target)
            .iter()
            .any(|effect| match action {
                ActionKind::Movement => effect.payload().block_movement,
                ActionKind::Combat => effect.payload().block_combat,
            })
    }

    /// Whether the target holds at least one effect of the given type.
    pub fn has_effect_type(&self, target: &EffectTarget, effect_type: EffectType) -> bool {
        self.effects_for_target(target)
            .iter()
            .any(|e| e.effect_type() == effect_type)
    }

    /// Total number of active effects.
    pub fn effect_count(&self) -> usize {
        self.players
            .values()
            .chain(self.npcs.values())
            .map(Vec::len)
            .sum()
    }

    /// Every target currently holding at least one effect.
    pub fn targets(&self) -> Vec<EffectTarget> {
        self.players
            .keys()
            .map(EffectTarget::player)
            .chain(self.npcs.keys().map(EffectTarget::npc))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Clock passes
    // -----------------------------------------------------------------------

    /// Advance every effect by one game tick.
    pub fn process_game_tick(&mut self, tick: u64) -> TickPassSummary {
        self.last_tick = tick;
        let applier = &self.applier;
        let mut expired = Vec::new();
        let mut applied = 0_usize;

        for effect in self
            .players
            .values_mut()
            .chain(self.npcs.values_mut())
            .flat_map(|effects| effects.iter_mut())
        {
            if effect.count_down() {
                expired.push(effect.id());
                continue;
            }
            if effect.take_tick_slot(tick) && applier.apply(effect).is_applied() {
                applied = applied.saturating_add(1);
            }
        }

        let expired_count = expired.len();
        for id in expired {
            self.remove_effect(id);
        }

        TickPassSummary {
            tick,
            applied,
            expired: expired_count,
        }
    }

    /// Apply every time-based effect whose interval has elapsed at `now`.
    /// Returns the number of payloads that reached their target.
    pub fn process_real_time_effects(&mut self, now: Instant) -> usize {
        let applier = &self.applier;
        let mut applied = 0_usize;

        for effect in self
            .players
            .values_mut()
            .chain(self.npcs.values_mut())
            .flat_map(|effects| effects.iter_mut())
        {
            if effect.take_real_time_slot(now) && applier.apply(effect).is_applied() {
                applied = applied.saturating_add(1);
            }
        }
        applied
    }

    /// Take every event emitted since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<EffectEvent> {
        std::mem::take(&mut self.outbox)
    }
}

/// Remove an effect from a partition, dropping the target's entry when it
/// becomes empty.
fn take(partition: &mut Partition, id: EffectId) -> Option<ActiveEffect> {
    let key = partition
        .iter()
        .find(|(_, effects)| effects.iter().any(|e| e.id() == id))
        .map(|(key, _)| key.clone())?;
    let effects = partition.get_mut(&key)?;
    let pos = effects.iter().position(|e| e.id() == id)?;
    let effect = effects.remove(pos);
    if effects.is_empty() {
        partition.remove(&key);
    }
    Some(effect)
}

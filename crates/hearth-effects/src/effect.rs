//! Active effects: transient modifiers attached to exactly one target.
//!
//! An [`ActiveEffect`] can only be built inside this crate, by the
//! registry's add operation. Outside code reads effects through the
//! accessors below and never mutates them.

use std::time::{Duration, Instant};

use hearth_types::{EffectId, EffectPayload, EffectSpec, EffectTarget, EffectType, StackingBehavior};
use serde::Serialize;

/// An effect currently registered on a target.
///
/// `remaining_ticks` is always positive while the effect is registered;
/// the tick pass removes it in the same sweep that brings it to zero.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveEffect {
    id: EffectId,
    target: EffectTarget,
    effect_type: EffectType,
    name: String,
    description: String,
    payload: EffectPayload,
    duration_ticks: u32,
    remaining_ticks: u32,
    tick_interval: u32,
    is_time_based: bool,
    real_time_interval_ms: u64,
    last_tick_applied: Option<u64>,
    #[serde(skip)]
    last_real_time_applied: Instant,
    stacking_behavior: StackingBehavior,
}

impl ActiveEffect {
    /// Build a fresh effect from a spec. The stacking behavior has already
    /// been resolved by the caller.
    pub(crate) fn from_spec(
        target: EffectTarget,
        spec: EffectSpec,
        stacking_behavior: StackingBehavior,
        now: Instant,
    ) -> Self {
        Self {
            id: EffectId::new(),
            target,
            effect_type: spec.effect_type,
            name: spec.name,
            description: spec.description,
            payload: spec.payload,
            duration_ticks: spec.duration_ticks,
            remaining_ticks: spec.duration_ticks,
            tick_interval: spec.tick_interval,
            is_time_based: spec.is_time_based,
            real_time_interval_ms: spec.real_time_interval_ms,
            last_tick_applied: None,
            last_real_time_applied: now,
            stacking_behavior,
        }
    }

    /// Unique id.
    pub const fn id(&self) -> EffectId {
        self.id
    }

    /// The entity this effect is attached to.
    pub const fn target(&self) -> &EffectTarget {
        &self.target
    }

    /// Stacking category.
    pub const fn effect_type(&self) -> EffectType {
        self.effect_type
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// What the effect does when it fires.
    pub const fn payload(&self) -> &EffectPayload {
        &self.payload
    }

    /// Total lifespan in ticks, as created.
    pub const fn duration_ticks(&self) -> u32 {
        self.duration_ticks
    }

    /// Ticks left before expiry.
    pub const fn remaining_ticks(&self) -> u32 {
        self.remaining_ticks
    }

    /// Ticks between periodic applications (0 = never).
    pub const fn tick_interval(&self) -> u32 {
        self.tick_interval
    }

    /// Whether payload cadence follows wall-clock time.
    pub const fn is_time_based(&self) -> bool {
        self.is_time_based
    }

    /// Milliseconds between real-time applications.
    pub const fn real_time_interval_ms(&self) -> u64 {
        self.real_time_interval_ms
    }

    /// The tick of the last tick-gated application, if any.
    pub const fn last_tick_applied(&self) -> Option<u64> {
        self.last_tick_applied
    }

    /// Resolved stacking behavior.
    pub const fn stacking_behavior(&self) -> StackingBehavior {
        self.stacking_behavior
    }

    /// Whether this effect fires on the tick clock.
    pub(crate) const fn is_tick_gated(&self) -> bool {
        !self.is_time_based && self.tick_interval > 0
    }

    /// Count one tick down. Returns `true` when the effect has expired.
    pub(crate) const fn count_down(&mut self) -> bool {
        self.remaining_ticks = self.remaining_ticks.saturating_sub(1);
        self.remaining_ticks == 0
    }

    /// Add ticks onto the remaining lifespan.
    pub(crate) const fn extend(&mut self, ticks: u32) {
        self.remaining_ticks = self.remaining_ticks.saturating_add(ticks);
    }

    /// If the tick gate is open at `tick`, record the application and
    /// return `true`.
    pub(crate) fn take_tick_slot(&mut self, tick: u64) -> bool {
        if !self.is_tick_gated() {
            return false;
        }
        let due = self
            .last_tick_applied
            .is_none_or(|last| tick.saturating_sub(last) >= u64::from(self.tick_interval));
        if due {
            self.last_tick_applied = Some(tick);
        }
        due
    }

    /// Record an application made outside the periodic gate.
    pub(crate) const fn mark_tick_applied(&mut self, tick: u64) {
        self.last_tick_applied = Some(tick);
    }

    /// If the real-time gate is open at `now`, record the application and
    /// return `true`. Effects that have already run out never fire.
    pub(crate) fn take_real_time_slot(&mut self, now: Instant) -> bool {
        if !self.is_time_based || self.remaining_ticks == 0 {
            return false;
        }
        let elapsed = now.saturating_duration_since(self.last_real_time_applied);
        if elapsed < Duration::from_millis(self.real_time_interval_ms) {
            return false;
        }
        self.last_real_time_applied = now;
        true
    }
}

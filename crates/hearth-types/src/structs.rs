//! Core data structs: effect payloads and specs, plus the vitals snapshots
//! exchanged with the session and room stores.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{EffectType, StackingBehavior};

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// What an effect does each time it fires, plus its passive modifiers.
///
/// Every field is optional. The `*_per_tick` fields take precedence over the
/// flat `*_amount` fields when both are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export, export_to = "bindings/")]
pub struct EffectPayload {
    /// Damage dealt on each application.
    pub damage_per_tick: Option<u32>,
    /// Flat damage used when `damage_per_tick` is unset.
    pub damage_amount: Option<u32>,
    /// Healing on each application.
    pub heal_per_tick: Option<u32>,
    /// Flat healing used when `heal_per_tick` is unset.
    pub heal_amount: Option<u32>,
    /// Signed stat deltas, summed across all active effects on a target.
    pub stat_modifiers: BTreeMap<String, i32>,
    /// Whether the target is prevented from moving.
    pub block_movement: bool,
    /// Whether the target is prevented from fighting.
    pub block_combat: bool,
}

impl EffectPayload {
    /// Damage per application, preferring `damage_per_tick`.
    pub fn damage(&self) -> Option<u32> {
        self.damage_per_tick.or(self.damage_amount)
    }

    /// Healing per application, preferring `heal_per_tick`.
    pub fn heal(&self) -> Option<u32> {
        self.heal_per_tick.or(self.heal_amount)
    }

    /// Scalar used by [`StackingBehavior::StrongestWins`]: the larger of the
    /// damage and heal magnitudes, 0 when neither is set.
    pub fn strength(&self) -> u32 {
        self.damage().unwrap_or(0).max(self.heal().unwrap_or(0))
    }

    /// Whether applying this payload can change health.
    pub const fn has_health_change(&self) -> bool {
        self.damage_per_tick.is_some()
            || self.damage_amount.is_some()
            || self.heal_per_tick.is_some()
            || self.heal_amount.is_some()
    }
}

// ---------------------------------------------------------------------------
// Spec
// ---------------------------------------------------------------------------

/// Caller-supplied description of an effect to add.
///
/// The registry turns a spec into an active effect, resolving its stacking
/// behavior and assigning an id. Specs deserialize from YAML/JSON so effect
/// templates can live in content files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EffectSpec {
    /// Category used for stacking decisions.
    pub effect_type: EffectType,
    /// Display name used in player messages.
    pub name: String,
    /// Display-only description.
    #[serde(default)]
    pub description: String,
    /// What the effect does.
    #[serde(default)]
    pub payload: EffectPayload,
    /// Total lifespan in game ticks.
    pub duration_ticks: u32,
    /// Ticks between payload applications; 0 disables periodic payload.
    #[serde(default)]
    pub tick_interval: u32,
    /// Whether payload cadence follows wall-clock time instead of ticks.
    #[serde(default)]
    pub is_time_based: bool,
    /// Milliseconds between payload applications for time-based effects.
    #[serde(default = "default_real_time_interval_ms")]
    pub real_time_interval_ms: u64,
    /// Explicit stacking override; falls back to the type default.
    #[serde(default)]
    pub stacking_behavior: Option<StackingBehavior>,
}

impl EffectSpec {
    /// Create a duration-only spec with an empty payload.
    pub fn new(effect_type: EffectType, name: impl Into<String>, duration_ticks: u32) -> Self {
        Self {
            effect_type,
            name: name.into(),
            description: String::new(),
            payload: EffectPayload::default(),
            duration_ticks,
            tick_interval: 0,
            is_time_based: false,
            real_time_interval_ms: default_real_time_interval_ms(),
            stacking_behavior: None,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Replace the payload.
    #[must_use]
    pub fn with_payload(mut self, payload: EffectPayload) -> Self {
        self.payload = payload;
        self
    }

    /// Fire the payload every `ticks` game ticks.
    #[must_use]
    pub const fn every_ticks(mut self, ticks: u32) -> Self {
        self.tick_interval = ticks;
        self.is_time_based = false;
        self
    }

    /// Fire the payload every `ms` milliseconds of wall-clock time.
    #[must_use]
    pub const fn every_millis(mut self, ms: u64) -> Self {
        self.real_time_interval_ms = ms;
        self.is_time_based = true;
        self
    }

    /// Override the stacking behavior for this instance.
    #[must_use]
    pub const fn stacking(mut self, behavior: StackingBehavior) -> Self {
        self.stacking_behavior = Some(behavior);
        self
    }
}

const fn default_real_time_interval_ms() -> u64 {
    1_000
}

// ---------------------------------------------------------------------------
// Target state snapshots
// ---------------------------------------------------------------------------

/// Health-related state of an online player, as read from the session store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PlayerVitals {
    /// Username (also the player target id).
    pub username: String,
    /// Current health; may be negative down to the unconscious floor.
    pub health: i32,
    /// Maximum health.
    pub max_health: i32,
    /// Whether the player is unconscious.
    pub unconscious: bool,
    /// Room the player currently stands in.
    pub room_id: String,
}

/// Partial stats update written back through the session store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StatsUpdate {
    /// New health value, if changed.
    pub health: Option<i32>,
    /// New unconscious flag, if changed.
    pub unconscious: Option<bool>,
}

impl StatsUpdate {
    /// Whether the update carries no changes.
    pub const fn is_empty(&self) -> bool {
        self.health.is_none() && self.unconscious.is_none()
    }
}

/// Health-related state of an NPC, as read from the room store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NpcVitals {
    /// Instance id (also the NPC target id).
    pub instance_id: String,
    /// Display name used in room broadcasts.
    pub name: String,
    /// Current health.
    pub health: i32,
    /// Maximum health.
    pub max_health: i32,
}

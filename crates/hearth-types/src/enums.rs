//! Enumeration types shared by the effect registry, the scheduler, and
//! their collaborators.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Effect categories
// ---------------------------------------------------------------------------

/// Categorical tag of an effect.
///
/// The type decides which existing effects a new one conflicts with: two
/// effects of the same type on the same target are resolved by the
/// [`StackingBehavior`] of the incoming effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EffectType {
    /// Damage over time from toxins.
    Poison,
    /// Healing over time.
    Regeneration,
    /// Prevents both movement and combat.
    Stun,
    /// Prevents movement only.
    Root,
    /// Damage over time from open wounds.
    Bleed,
    /// Damage over time from fire.
    Burn,
    /// Generic damage over time.
    DamageOverTime,
    /// Generic healing over time.
    HealOverTime,
    /// Positive strength modifier.
    StrengthBuff,
    /// Positive agility modifier.
    AgilityBuff,
    /// Positive defense modifier.
    DefenseBuff,
    /// Negative strength modifier.
    Weakness,
    /// Negative agility modifier.
    Slow,
    /// One-shot damage carried as a short-lived effect.
    InstantDamage,
    /// One-shot healing carried as a short-lived effect.
    InstantHeal,
}

impl EffectType {
    /// Every effect type, in declaration order.
    pub const ALL: [Self; 15] = [
        Self::Poison,
        Self::Regeneration,
        Self::Stun,
        Self::Root,
        Self::Bleed,
        Self::Burn,
        Self::DamageOverTime,
        Self::HealOverTime,
        Self::StrengthBuff,
        Self::AgilityBuff,
        Self::DefenseBuff,
        Self::Weakness,
        Self::Slow,
        Self::InstantDamage,
        Self::InstantHeal,
    ];

    /// The `snake_case` name used in configuration files and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Poison => "poison",
            Self::Regeneration => "regeneration",
            Self::Stun => "stun",
            Self::Root => "root",
            Self::Bleed => "bleed",
            Self::Burn => "burn",
            Self::DamageOverTime => "damage_over_time",
            Self::HealOverTime => "heal_over_time",
            Self::StrengthBuff => "strength_buff",
            Self::AgilityBuff => "agility_buff",
            Self::DefenseBuff => "defense_buff",
            Self::Weakness => "weakness",
            Self::Slow => "slow",
            Self::InstantDamage => "instant_damage",
            Self::InstantHeal => "instant_heal",
        }
    }
}

impl core::fmt::Display for EffectType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Stacking
// ---------------------------------------------------------------------------

/// Policy applied when an effect is added to a target that already holds
/// one or more effects of the same [`EffectType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum StackingBehavior {
    /// Remove every same-type effect, then insert the new one.
    Replace,
    /// Same as [`Replace`](Self::Replace): the new instance restarts the
    /// duration. Kept as a distinct tag for content readability.
    #[default]
    Refresh,
    /// Extend the first same-type effect by the new duration; the new
    /// instance is discarded.
    StackDuration,
    /// Keep every existing instance and add the new one alongside.
    StackIntensity,
    /// Keep whichever is stronger; ties go to the new instance.
    StrongestWins,
    /// Discard the new instance if any same-type effect exists.
    Ignore,
}

// ---------------------------------------------------------------------------
// Action blocking
// ---------------------------------------------------------------------------

/// Kind of action a caller asks about when checking effect-driven blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ActionKind {
    /// Leaving the current room.
    Movement,
    /// Starting or continuing combat.
    Combat,
}

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

/// The entity an effect is attached to.
///
/// Players and NPCs live in separate partitions of the registry. The
/// derived ordering (players before NPCs, then by id) is the iteration
/// order of every registry sweep.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EffectTarget {
    /// A player, keyed by username.
    Player(String),
    /// An NPC, keyed by instance id.
    Npc(String),
}

impl EffectTarget {
    /// Build a player target.
    pub fn player(username: impl Into<String>) -> Self {
        Self::Player(username.into())
    }

    /// Build an NPC target.
    pub fn npc(instance_id: impl Into<String>) -> Self {
        Self::Npc(instance_id.into())
    }

    /// Return the raw id without the partition tag.
    pub fn id(&self) -> &str {
        match self {
            Self::Player(id) | Self::Npc(id) => id,
        }
    }

    /// Whether this target is a player.
    pub const fn is_player(&self) -> bool {
        matches!(self, Self::Player(_))
    }
}

impl core::fmt::Display for EffectTarget {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Player(id) => write!(f, "player:{id}"),
            Self::Npc(id) => write!(f, "npc:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_type_names_match_serde() {
        for ty in EffectType::ALL {
            let json = serde_json::to_string(&ty).unwrap_or_default();
            assert_eq!(json, format!("\"{}\"", ty.as_str()));
        }
    }

    #[test]
    fn default_stacking_is_refresh() {
        assert_eq!(StackingBehavior::default(), StackingBehavior::Refresh);
    }

    #[test]
    fn players_sort_before_npcs() {
        let mut targets = vec![
            EffectTarget::npc("a-goblin"),
            EffectTarget::player("zed"),
            EffectTarget::player("alice"),
        ];
        targets.sort();
        assert_eq!(
            targets,
            vec![
                EffectTarget::player("alice"),
                EffectTarget::player("zed"),
                EffectTarget::npc("a-goblin"),
            ]
        );
    }

    #[test]
    fn target_display_is_tagged() {
        assert_eq!(EffectTarget::player("bob").to_string(), "player:bob");
        assert_eq!(EffectTarget::npc("rat-1").to_string(), "npc:rat-1");
        assert_eq!(EffectTarget::npc("rat-1").id(), "rat-1");
    }
}

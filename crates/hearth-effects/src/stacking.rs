//! Stacking resolution: what happens when an effect lands on a target that
//! already holds effects of the same type.
//!
//! Resolution is split in two steps:
//!
//! 1. [`StackingTable::behavior_for`] picks the behavior: the [`EffectSpec`]'s
//!    explicit override, else the type default from the table, else
//!    [`StackingBehavior::Refresh`].
//! 2. [`resolve`] turns the behavior plus the same-type effects into a
//!    [`StackDecision`] the registry carries out.
//!
//! `resolve` is pure so every policy can be tested without a registry.

use std::collections::BTreeMap;

use hearth_types::{EffectId, EffectPayload, EffectSpec, EffectType, StackingBehavior};

use crate::effect::ActiveEffect;

/// Per-type default stacking behaviors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackingTable {
    defaults: BTreeMap<EffectType, StackingBehavior>,
}

impl Default for StackingTable {
    /// The built-in table. Types not listed fall back to
    /// [`StackingBehavior::Refresh`].
    fn default() -> Self {
        let defaults = BTreeMap::from([
            (EffectType::Poison, StackingBehavior::StackIntensity),
            (EffectType::Bleed, StackingBehavior::StackIntensity),
            (EffectType::Burn, StackingBehavior::StackDuration),
            (EffectType::Regeneration, StackingBehavior::Refresh),
            (EffectType::Stun, StackingBehavior::Ignore),
            (EffectType::Root, StackingBehavior::Refresh),
            (EffectType::StrengthBuff, StackingBehavior::StrongestWins),
            (EffectType::AgilityBuff, StackingBehavior::StrongestWins),
            (EffectType::DefenseBuff, StackingBehavior::StrongestWins),
            (EffectType::InstantDamage, StackingBehavior::StackIntensity),
            (EffectType::InstantHeal, StackingBehavior::StackIntensity),
        ]);
        Self { defaults }
    }
}

impl StackingTable {
    /// A table with no type defaults: everything resolves to `Refresh`
    /// unless an [`EffectSpec`] overrides it.
    pub const fn empty() -> Self {
        Self {
            defaults: BTreeMap::new(),
        }
    }

    /// The built-in table with `overrides` layered on top.
    pub fn with_overrides(overrides: &BTreeMap<EffectType, StackingBehavior>) -> Self {
        let mut table = Self::default();
        table.defaults.extend(overrides.iter().map(|(ty, b)| (*ty, *b)));
        table
    }

    /// Set the default for one type.
    pub fn set(&mut self, effect_type: EffectType, behavior: StackingBehavior) {
        self.defaults.insert(effect_type, behavior);
    }

    /// The configured default for a type, if any.
    pub fn default_for(&self, effect_type: EffectType) -> Option<StackingBehavior> {
        self.defaults.get(&effect_type).copied()
    }

    /// The behavior a new effect built from `spec` will carry.
    pub fn behavior_for(&self, spec: &EffectSpec) -> StackingBehavior {
        spec.stacking_behavior
            .or_else(|| self.default_for(spec.effect_type))
            .unwrap_or_default()
    }
}

/// What the registry must do with an incoming effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackDecision {
    /// Insert the candidate; existing effects stay.
    Insert,
    /// Remove these effects, then insert the candidate.
    Replace(Vec<EffectId>),
    /// Add the candidate's duration onto this effect; drop the candidate.
    Extend(EffectId),
    /// Drop the candidate.
    Discard,
}

/// Decide how a candidate interacts with the same-type effects already on
/// its target. `existing` must be in registration order.
pub fn resolve(
    behavior: StackingBehavior,
    existing: &[&ActiveEffect],
    candidate: &EffectPayload,
) -> StackDecision {
    let Some(first) = existing.first() else {
        return StackDecision::Insert;
    };

    match behavior {
        StackingBehavior::Replace | StackingBehavior::Refresh => {
            StackDecision::Replace(existing.iter().map(|e| e.id()).collect())
        }
        StackingBehavior::StackDuration => StackDecision::Extend(first.id()),
        StackingBehavior::StackIntensity => StackDecision::Insert,
        StackingBehavior::StrongestWins => {
            let strongest = existing
                .iter()
                .map(|e| e.payload().strength())
                .max()
                .unwrap_or(0);
            if candidate.strength() >= strongest {
                StackDecision::Replace(existing.iter().map(|e| e.id()).collect())
            } else {
                StackDecision::Discard
            }
        }
        StackingBehavior::Ignore => StackDecision::Discard,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Instant;

    use hearth_types::EffectTarget;

    use super::*;

    fn damage(amount: u32) -> EffectPayload {
        EffectPayload {
            damage_per_tick: Some(amount),
            ..EffectPayload::default()
        }
    }

    fn effect(amount: u32) -> ActiveEffect {
        let spec = EffectSpec::new(EffectType::Poison, "Venom", 5).with_payload(damage(amount));
        ActiveEffect::from_spec(
            EffectTarget::player("ann"),
            spec,
            StackingBehavior::StrongestWins,
            Instant::now(),
        )
    }

    #[test]
    fn nothing_existing_always_inserts() {
        for behavior in [
            StackingBehavior::Replace,
            StackingBehavior::Refresh,
            StackingBehavior::StackDuration,
            StackingBehavior::StackIntensity,
            StackingBehavior::StrongestWins,
            StackingBehavior::Ignore,
        ] {
            assert_eq!(resolve(behavior, &[], &damage(1)), StackDecision::Insert);
        }
    }

    #[test]
    fn refresh_replaces_every_existing() {
        let a = effect(1);
        let b = effect(2);
        let decision = resolve(StackingBehavior::Refresh, &[&a, &b], &damage(1));
        assert_eq!(decision, StackDecision::Replace(vec![a.id(), b.id()]));
    }

    #[test]
    fn stack_duration_extends_first() {
        let a = effect(1);
        let b = effect(2);
        let decision = resolve(StackingBehavior::StackDuration, &[&a, &b], &damage(9));
        assert_eq!(decision, StackDecision::Extend(a.id()));
    }

    #[test]
    fn strongest_wins_keeps_stronger_existing() {
        let five = effect(5);
        assert_eq!(
            resolve(StackingBehavior::StrongestWins, &[&five], &damage(3)),
            StackDecision::Discard
        );
        assert_eq!(
            resolve(StackingBehavior::StrongestWins, &[&five], &damage(7)),
            StackDecision::Replace(vec![five.id()])
        );
    }

    #[test]
    fn strongest_wins_tie_goes_to_candidate() {
        let five = effect(5);
        assert_eq!(
            resolve(StackingBehavior::StrongestWins, &[&five], &damage(5)),
            StackDecision::Replace(vec![five.id()])
        );
    }

    #[test]
    fn strength_falls_back_to_flat_amounts() {
        let five = effect(5);
        let flat_heal = EffectPayload {
            heal_amount: Some(6),
            ..EffectPayload::default()
        };
        assert_eq!(
            resolve(StackingBehavior::StrongestWins, &[&five], &flat_heal),
            StackDecision::Replace(vec![five.id()])
        );
    }

    #[test]
    fn ignore_discards_when_present() {
        let a = effect(1);
        assert_eq!(
            resolve(StackingBehavior::Ignore, &[&a], &damage(100)),
            StackDecision::Discard
        );
    }

    #[test]
    fn behavior_precedence() {
        let mut table = StackingTable::empty();
        let spec = EffectSpec::new(EffectType::Poison, "Venom", 5);
        assert_eq!(table.behavior_for(&spec), StackingBehavior::Refresh);

        table.set(EffectType::Poison, StackingBehavior::StackIntensity);
        assert_eq!(table.behavior_for(&spec), StackingBehavior::StackIntensity);

        let spec = spec.stacking(StackingBehavior::Ignore);
        assert_eq!(table.behavior_for(&spec), StackingBehavior::Ignore);
    }

    #[test]
    fn overrides_layer_on_builtin_table() {
        let overrides = BTreeMap::from([(EffectType::Stun, StackingBehavior::Refresh)]);
        let table = StackingTable::with_overrides(&overrides);
        assert_eq!(table.default_for(EffectType::Stun), Some(StackingBehavior::Refresh));
        assert_eq!(
            table.default_for(EffectType::Poison),
            Some(StackingBehavior::StackIntensity)
        );
        assert_eq!(table.default_for(EffectType::Slow), None);
    }
}

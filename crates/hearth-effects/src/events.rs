//! Effect lifecycle events emitted by the registry.

use hearth_types::EffectTarget;
use serde::Serialize;

use crate::effect::ActiveEffect;

/// A change in the set of effects on a target.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EffectEvent {
    /// An add request was processed.
    Added {
        /// The target the effect was aimed at.
        target: EffectTarget,
        /// The inserted effect, or `None` when stacking discarded it.
        effect: Option<ActiveEffect>,
    },
    /// An effect left its target, by expiry or explicit removal.
    Removed {
        /// The target the effect was attached to.
        target: EffectTarget,
        /// The effect as it was at removal.
        effect: ActiveEffect,
    },
}

impl EffectEvent {
    /// The target this event concerns.
    pub const fn target(&self) -> &EffectTarget {
        match self {
            Self::Added { target, .. } | Self::Removed { target, .. } => target,
        }
    }
}

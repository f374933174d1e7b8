//! Payload application: turning one firing of one effect into changes on
//! its target.
//!
//! The applier is the only writer of effect-driven target state. For
//! players it reads the live session, clamps health between the
//! unconscious floor and `max_health`, flips the unconscious flag when
//! health crosses zero, persists the result immediately, and writes a
//! single coalesced message. For NPCs it resolves the NPC through the room
//! store and writes health back directly. Death handling is left to the
//! combat subsystem.

use std::sync::Arc;

use hearth_types::{EffectTarget, NpcVitals, PlayerVitals, StatsUpdate};
use tracing::{debug, warn};

use crate::effect::ActiveEffect;
use crate::ports::{RoomStore, SessionStore};

/// Default lowest health a player can be pushed to by effects.
pub const DEFAULT_UNCONSCIOUS_THRESHOLD: i32 = -10;

/// What one payload application did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Health changed (or a zero-sized change was attempted).
    Applied {
        /// Health before the application.
        before: i32,
        /// Health after the application.
        after: i32,
        /// Whether a message was written to the player.
        messaged: bool,
        /// Whether the room was told about a consciousness change.
        broadcast: bool,
    },
    /// The payload has nothing that changes health.
    NoChange,
    /// The target is offline or no longer in any room.
    TargetMissing,
}

impl ApplyOutcome {
    /// Whether the payload reached its target.
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Applies effect payloads to players and NPCs through the stores.
#[derive(Clone)]
pub struct EffectApplier {
    sessions: Arc<dyn SessionStore>,
    rooms: Arc<dyn RoomStore>,
    unconscious_threshold: i32,
}

impl core::fmt::Debug for EffectApplier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EffectApplier")
            .field("unconscious_threshold", &self.unconscious_threshold)
            .finish_non_exhaustive()
    }
}

impl EffectApplier {
    /// Create an applier over the given stores.
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        rooms: Arc<dyn RoomStore>,
        unconscious_threshold: i32,
    ) -> Self {
        Self {
            sessions,
            rooms,
            unconscious_threshold,
        }
    }

    /// The configured unconscious floor.
    pub const fn unconscious_threshold(&self) -> i32 {
        self.unconscious_threshold
    }

    /// Apply one firing of `effect` to its target.
    pub fn apply(&self, effect: &ActiveEffect) -> ApplyOutcome {
        if !effect.payload().has_health_change() {
            return ApplyOutcome::NoChange;
        }
        match effect.target() {
            EffectTarget::Player(username) => self.apply_to_player(username, effect),
            EffectTarget::Npc(instance_id) => self.apply_to_npc(instance_id, effect),
        }
    }

    /// Write a message to a player target. NPC targets are ignored.
    pub fn notify(&self, target: &EffectTarget, message: &str) {
        if let EffectTarget::Player(username) = target {
            if !self.sessions.send_message(username, message) {
                debug!(%username, "player offline, notification dropped");
            }
        }
    }

    fn apply_to_player(&self, username: &str, effect: &ActiveEffect) -> ApplyOutcome {
        let Some(vitals) = self.sessions.active_session(username) else {
            debug!(%username, effect = effect.name(), "player offline, payload skipped");
            return ApplyOutcome::TargetMissing;
        };

        let mut lines = Vec::new();
        let before = vitals.health;
        let after = self.next_player_health(&vitals, effect, &mut lines);

        let mut update = StatsUpdate::default();
        if after != before {
            update.health = Some(after);
        }

        let mut broadcast = false;
        let crossing = consciousness_crossing(before, after);
        if let Some(now_unconscious) = crossing {
            update.unconscious = Some(now_unconscious);
            let (own, room) = if now_unconscious {
                (
                    "You collapse to the ground, unconscious!".to_owned(),
                    format!("{username} collapses to the ground, unconscious!"),
                )
            } else {
                (
                    "You regain consciousness.".to_owned(),
                    format!("{username} regains consciousness."),
                )
            };
            lines.push(own);
            broadcast = self.rooms.broadcast(&vitals.room_id, &room, Some(username));
        }

        if !update.is_empty() && !self.sessions.update_stats(username, &update) {
            warn!(%username, "stats update rejected by session store");
        }

        let messaged = !lines.is_empty() && self.sessions.send_message(username, &lines.join("\n"));

        debug!(
            %username,
            effect = effect.name(),
            before,
            after,
            unconscious = ?crossing,
            "effect payload applied"
        );

        ApplyOutcome::Applied {
            before,
            after,
            messaged,
            broadcast,
        }
    }

    fn next_player_health(
        &self,
        vitals: &PlayerVitals,
        effect: &ActiveEffect,
        lines: &mut Vec<String>,
    ) -> i32 {
        let payload = effect.payload();
        let mut health = vitals.health;

        if let Some(damage) = payload.damage().filter(|d| *d > 0) {
            // Never lift a player already pushed below the floor elsewhere.
            let floor = self.unconscious_threshold.min(health);
            let damaged = health.saturating_sub(to_i32(damage)).max(floor);
            if damaged != health {
                lines.push(format!("You take {damage} damage from {}.", effect.name()));
            }
            health = damaged;
        }
        if let Some(heal) = payload.heal().filter(|h| *h > 0) {
            health = health.saturating_add(to_i32(heal)).min(vitals.max_health);
            lines.push(format!("You recover {heal} health from {}.", effect.name()));
        }
        health
    }

    fn apply_to_npc(&self, instance_id: &str, effect: &ActiveEffect) -> ApplyOutcome {
        let Some((room_id, npc)) = self.locate_npc(instance_id) else {
            debug!(%instance_id, effect = effect.name(), "NPC not found, payload skipped");
            return ApplyOutcome::TargetMissing;
        };

        let payload = effect.payload();
        let before = npc.health;
        let mut after = before;
        if let Some(damage) = payload.damage() {
            after = after.saturating_sub(to_i32(damage)).max(0);
        }
        if let Some(heal) = payload.heal() {
            after = after.saturating_add(to_i32(heal)).min(npc.max_health);
        }

        if after != before && !self.rooms.set_npc_health(&room_id, instance_id, after) {
            warn!(%instance_id, %room_id, "NPC left its room before health was written");
        }

        debug!(
            %instance_id,
            npc = npc.name,
            effect = effect.name(),
            before,
            after,
            "effect payload applied"
        );

        ApplyOutcome::Applied {
            before,
            after,
            messaged: false,
            broadcast: false,
        }
    }

    fn locate_npc(&self, instance_id: &str) -> Option<(String, NpcVitals)> {
        self.rooms.room_ids().into_iter().find_map(|room_id| {
            self.rooms
                .npc(&room_id, instance_id)
                .map(|npc| (room_id, npc))
        })
    }
}

/// `Some(true)` when health drops from positive to zero or below,
/// `Some(false)` when it climbs back above zero, `None` otherwise.
const fn consciousness_crossing(before: i32, after: i32) -> Option<bool> {
    if before > 0 && after <= 0 {
        Some(true)
    } else if before <= 0 && after > 0 {
        Some(false)
    } else {
        None
    }
}

fn to_i32(amount: u32) -> i32 {
    i32::try_from(amount).unwrap_or(i32::MAX)
}

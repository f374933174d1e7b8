//! Collaborator ports: the narrow views of the session and room stores that
//! the effect engine needs.
//!
//! Target state (health, unconscious flag, NPC fields) is owned by these
//! stores. The engine reads snapshots and writes changes back; it never
//! holds references into store internals. Implementations must be cheap to
//! call from the effect actor: every call happens on the hot path of a tick
//! or real-time pass, except [`force_save`](SessionStore::force_save),
//! which the scheduler runs on the blocking pool.

use hearth_types::{NpcVitals, PlayerVitals, StatsUpdate};

use crate::error::PortError;

/// Live player sessions and their persisted stats.
pub trait SessionStore: Send + Sync {
    /// Return the vitals of an online player, or `None` if the player has
    /// no active session.
    fn active_session(&self, username: &str) -> Option<PlayerVitals>;

    /// Persist a partial stats change. Returns `false` if the player is
    /// unknown.
    fn update_stats(&self, username: &str, update: &StatsUpdate) -> bool;

    /// Write one formatted message to the player's session. Returns `false`
    /// if the player is offline.
    fn send_message(&self, username: &str, message: &str) -> bool;

    /// Flush all user state to durable storage.
    fn force_save(&self) -> Result<(), PortError>;
}

/// Rooms, the NPCs standing in them, and room-wide messaging.
pub trait RoomStore: Send + Sync {
    /// Ids of every loaded room.
    fn room_ids(&self) -> Vec<String>;

    /// Look up an NPC instance in a specific room.
    fn npc(&self, room_id: &str, instance_id: &str) -> Option<NpcVitals>;

    /// Overwrite an NPC's current health. Returns `false` if the NPC is no
    /// longer in that room.
    fn set_npc_health(&self, room_id: &str, instance_id: &str, health: i32) -> bool;

    /// Send a message to everyone in a room, optionally skipping one
    /// player. Returns `false` if the room does not exist.
    fn broadcast(&self, room_id: &str, message: &str, exclude: Option<&str>) -> bool;

    /// Flush all room state to durable storage.
    fn force_save(&self) -> Result<(), PortError>;
}

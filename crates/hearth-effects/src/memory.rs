//! In-memory implementations of the collaborator ports.
//!
//! Used by the demo binary and by tests. Both stores record every message
//! and broadcast they receive so behavior can be asserted afterwards, and
//! both can be told to fail their next saves.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use hearth_types::{NpcVitals, PlayerVitals, StatsUpdate};
use tracing::debug;

use crate::error::PortError;
use crate::ports::{RoomStore, SessionStore};

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct SessionTable {
    online: BTreeMap<String, PlayerVitals>,
    messages: Vec<(String, String)>,
    saves: u32,
    fail_saves: bool,
}

/// Session store backed by a map of online players.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: Mutex<SessionTable>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionTable> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bring a player online with the given vitals.
    pub fn login(&self, vitals: PlayerVitals) {
        let mut table = self.lock();
        table.online.insert(vitals.username.clone(), vitals);
    }

    /// Take a player offline. Returns the vitals they had.
    pub fn logout(&self, username: &str) -> Option<PlayerVitals> {
        self.lock().online.remove(username)
    }

    /// Current vitals of an online player.
    pub fn player(&self, username: &str) -> Option<PlayerVitals> {
        self.lock().online.get(username).cloned()
    }

    /// Every message written to a player's session, oldest first.
    pub fn messages_for(&self, username: &str) -> Vec<String> {
        self.lock()
            .messages
            .iter()
            .filter(|(to, _)| to == username)
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// Number of successful forced saves.
    pub fn save_count(&self) -> u32 {
        self.lock().saves
    }

    /// Make subsequent saves fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        self.lock().fail_saves = fail;
    }
}

impl SessionStore for MemorySessionStore {
    fn active_session(&self, username: &str) -> Option<PlayerVitals> {
        self.player(username)
    }

    fn update_stats(&self, username: &str, update: &StatsUpdate) -> bool {
        let mut table = self.lock();
        let Some(vitals) = table.online.get_mut(username) else {
            return false;
        };
        if let Some(health) = update.health {
            vitals.health = health;
        }
        if let Some(unconscious) = update.unconscious {
            vitals.unconscious = unconscious;
        }
        true
    }

    fn send_message(&self, username: &str, message: &str) -> bool {
        let mut table = self.lock();
        if !table.online.contains_key(username) {
            return false;
        }
        table.messages.push((username.to_owned(), message.to_owned()));
        true
    }

    fn force_save(&self) -> Result<(), PortError> {
        let mut table = self.lock();
        if table.fail_saves {
            return Err(PortError::SaveFailed {
                store: "sessions",
                reason: "simulated failure".to_owned(),
            });
        }
        table.saves = table.saves.saturating_add(1);
        debug!(players = table.online.len(), "session store saved");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Rooms
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct RoomEntry {
    npcs: BTreeMap<String, NpcVitals>,
    broadcasts: Vec<String>,
}

#[derive(Debug, Default)]
struct RoomTable {
    rooms: BTreeMap<String, RoomEntry>,
    saves: u32,
    fail_saves: bool,
}

/// Room store backed by a map of rooms, each holding its NPCs.
#[derive(Debug, Default)]
pub struct MemoryRoomStore {
    inner: Mutex<RoomTable>,
}

impl MemoryRoomStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RoomTable> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create an empty room. Existing rooms are left untouched.
    pub fn add_room(&self, room_id: &str) {
        self.lock().rooms.entry(room_id.to_owned()).or_default();
    }

    /// Place an NPC in a room, creating the room if needed.
    pub fn add_npc(&self, room_id: &str, npc: NpcVitals) {
        let mut table = self.lock();
        let room = table.rooms.entry(room_id.to_owned()).or_default();
        room.npcs.insert(npc.instance_id.clone(), npc);
    }

    /// Remove an NPC from whichever room holds it.
    pub fn remove_npc(&self, instance_id: &str) -> Option<NpcVitals> {
        self.lock()
            .rooms
            .values_mut()
            .find_map(|room| room.npcs.remove(instance_id))
    }

    /// Every broadcast sent to a room, oldest first.
    pub fn broadcasts(&self, room_id: &str) -> Vec<String> {
        self.lock()
            .rooms
            .get(room_id)
            .map(|room| room.broadcasts.clone())
            .unwrap_or_default()
    }

    /// Number of successful forced saves.
    pub fn save_count(&self) -> u32 {
        self.lock().saves
    }

    /// Make subsequent saves fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        self.lock().fail_saves = fail;
    }
}

impl RoomStore for MemoryRoomStore {
    fn room_ids(&self) -> Vec<String> {
        self.lock().rooms.keys().cloned().collect()
    }

    fn npc(&self, room_id: &str, instance_id: &str) -> Option<NpcVitals> {
        self.lock()
            .rooms
            .get(room_id)
            .and_then(|room| room.npcs.get(instance_id))
            .cloned()
    }

    fn set_npc_health(&self, room_id: &str, instance_id: &str, health: i32) -> bool {
        let mut table = self.lock();
        let Some(npc) = table
            .rooms
            .get_mut(room_id)
            .and_then(|room| room.npcs.get_mut(instance_id))
        else {
            return false;
        };
        npc.health = health;
        true
    }

    fn broadcast(&self, room_id: &str, message: &str, _exclude: Option<&str>) -> bool {
        let mut table = self.lock();
        let Some(room) = table.rooms.get_mut(room_id) else {
            return false;
        };
        room.broadcasts.push(message.to_owned());
        true
    }

    fn force_save(&self) -> Result<(), PortError> {
        let mut table = self.lock();
        if table.fail_saves {
            return Err(PortError::SaveFailed {
                store: "rooms",
                reason: "simulated failure".to_owned(),
            });
        }
        table.saves = table.saves.saturating_add(1);
        debug!(rooms = table.rooms.len(), "room store saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vitals(name: &str) -> PlayerVitals {
        PlayerVitals {
            username: name.to_owned(),
            health: 50,
            max_health: 100,
            unconscious: false,
            room_id: "square".to_owned(),
        }
    }

    #[test]
    fn offline_players_get_no_messages() {
        let store = MemorySessionStore::new();
        assert!(!store.send_message("ghost", "boo"));
        store.login(vitals("ann"));
        assert!(store.send_message("ann", "hello"));
        assert_eq!(store.messages_for("ann"), vec!["hello".to_owned()]);
        assert!(store.logout("ann").is_some());
        assert!(store.active_session("ann").is_none());
    }

    #[test]
    fn stats_update_is_partial() {
        let store = MemorySessionStore::new();
        store.login(vitals("ann"));
        let update = StatsUpdate {
            health: Some(12),
            unconscious: None,
        };
        assert!(store.update_stats("ann", &update));
        let ann = store.player("ann");
        assert_eq!(ann.as_ref().map(|v| v.health), Some(12));
        assert_eq!(ann.map(|v| v.unconscious), Some(false));
    }

    #[test]
    fn failing_saves_are_reported() {
        let rooms = MemoryRoomStore::new();
        assert!(rooms.force_save().is_ok());
        rooms.set_fail_saves(true);
        assert!(rooms.force_save().is_err());
        assert_eq!(rooms.save_count(), 1);
    }

    #[test]
    fn npc_lookup_is_per_room() {
        let rooms = MemoryRoomStore::new();
        rooms.add_npc(
            "cellar",
            NpcVitals {
                instance_id: "rat-1".to_owned(),
                name: "a rat".to_owned(),
                health: 8,
                max_health: 8,
            },
        );
        assert!(rooms.npc("cellar", "rat-1").is_some());
        assert!(rooms.npc("square", "rat-1").is_none());
        assert!(rooms.set_npc_health("cellar", "rat-1", 3));
        assert_eq!(rooms.npc("cellar", "rat-1").map(|n| n.health), Some(3));
        assert!(!rooms.broadcast("nowhere", "hi", None));
    }
}

//! A small in-memory world so the engine has something to tick.

use std::sync::Arc;

use hearth_core::effects::EffectHandle;
use hearth_effects::{MemoryRoomStore, MemorySessionStore};
use hearth_types::{
    EffectPayload, EffectSpec, EffectTarget, EffectType, NpcVitals, PlayerVitals,
};
use tracing::info;

/// Stores backing the demo world.
pub struct DemoWorld {
    /// Online players.
    pub sessions: Arc<MemorySessionStore>,
    /// Rooms and the NPCs in them.
    pub rooms: Arc<MemoryRoomStore>,
}

/// Build two rooms, two players, and a rat.
pub fn build() -> DemoWorld {
    let sessions = Arc::new(MemorySessionStore::new());
    let rooms = Arc::new(MemoryRoomStore::new());

    rooms.add_room("town-square");
    rooms.add_npc(
        "cellar",
        NpcVitals {
            instance_id: "rat-1".to_owned(),
            name: "a sewer rat".to_owned(),
            health: 20,
            max_health: 20,
        },
    );

    for (username, health) in [("wren", 60), ("osric", 100)] {
        sessions.login(PlayerVitals {
            username: username.to_owned(),
            health,
            max_health: 100,
            unconscious: false,
            room_id: "town-square".to_owned(),
        });
    }

    DemoWorld { sessions, rooms }
}

/// Put a few effects in play: healing on one player, a burn ticking in real
/// time on the other, and poison on the rat.
pub async fn seed_effects(effects: &EffectHandle) {
    let regen = EffectSpec::new(EffectType::Regeneration, "Soothing Balm", 8)
        .with_description("Warm herbs knit your wounds.")
        .every_ticks(1)
        .with_payload(EffectPayload {
            heal_per_tick: Some(5),
            ..EffectPayload::default()
        });

    let burn = EffectSpec::new(EffectType::Burn, "Smoldering Cloak", 3)
        .with_description("Embers cling to your clothes.")
        .every_millis(2_000)
        .with_payload(EffectPayload {
            damage_per_tick: Some(1),
            ..EffectPayload::default()
        });

    let venom = EffectSpec::new(EffectType::Poison, "Spider Venom", 4)
        .every_ticks(2)
        .with_payload(EffectPayload {
            damage_per_tick: Some(3),
            stat_modifiers: [("agility".to_owned(), -2)].into_iter().collect(),
            ..EffectPayload::default()
        });

    let seeded = [
        effects.add_effect(EffectTarget::player("wren"), regen).await,
        effects.add_effect(EffectTarget::player("osric"), burn).await,
        effects.add_effect(EffectTarget::npc("rat-1"), venom).await,
    ];
    info!(
        seeded = seeded.iter().flatten().count(),
        "demo effects seeded"
    );
}

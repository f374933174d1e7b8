//! Shared type definitions for the Hearth effect and tick engine.
//!
//! This crate is the vocabulary shared by the effect registry, the tick
//! scheduler, and the stores they talk to. Types flow downstream to
//! `TypeScript` via `ts-rs` for the admin dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper for effect identifiers
//! - [`enums`] -- Effect types, stacking behaviors, action kinds, targets
//! - [`structs`] -- Effect payloads and specs, player/NPC vitals snapshots

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{ActionKind, EffectTarget, EffectType, StackingBehavior};
pub use ids::EffectId;
pub use structs::{EffectPayload, EffectSpec, NpcVitals, PlayerVitals, StatsUpdate};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs writes the bindings into `bindings/` relative to the crate
        // root when `export_all` is called.
        use ts_rs::TS;

        let _ = crate::ids::EffectId::export_all();
        let _ = crate::enums::EffectType::export_all();
        let _ = crate::enums::StackingBehavior::export_all();
        let _ = crate::enums::ActionKind::export_all();
        let _ = crate::enums::EffectTarget::export_all();
        let _ = crate::structs::EffectPayload::export_all();
        let _ = crate::structs::EffectSpec::export_all();
        let _ = crate::structs::PlayerVitals::export_all();
        let _ = crate::structs::StatsUpdate::export_all();
        let _ = crate::structs::NpcVitals::export_all();
    }
}

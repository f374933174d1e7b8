//! Combat port: the downstream subsystem driven once per world tick.
//!
//! Combat math lives elsewhere. The scheduler only needs to advance the
//! global combat round and then every room's local combat, in that order,
//! and to keep ticking when either fails.

/// Errors reported by a combat subsystem.
#[derive(Debug, thiserror::Error)]
pub enum CombatError {
    /// The global combat round could not be processed.
    #[error("combat round failed: {reason}")]
    Round {
        /// Description of the failure.
        reason: String,
    },

    /// One room's combat could not be processed.
    #[error("room combat failed in {room_id}: {reason}")]
    Room {
        /// The room that failed.
        room_id: String,
        /// Description of the failure.
        reason: String,
    },
}

/// Turn-based combat processing invoked by the tick scheduler.
pub trait CombatSystem: Send + Sync {
    /// Advance every active fight by one round.
    fn process_combat_round(&self) -> Result<(), CombatError>;

    /// Resolve per-room combat (aggressive NPCs, fleeing, and so on).
    fn process_room_combat(&self) -> Result<(), CombatError>;
}

/// A combat system with nothing to do.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdleCombat;

impl CombatSystem for IdleCombat {
    fn process_combat_round(&self) -> Result<(), CombatError> {
        Ok(())
    }

    fn process_room_combat(&self) -> Result<(), CombatError> {
        Ok(())
    }
}

//! Effect registry, stacking resolution, and payload application.
//!
//! Everything in this crate is synchronous. The async orchestration in
//! `hearth-core` owns one [`EffectRegistry`] inside a single task and feeds
//! it commands from both clocks.
//!
//! # Modules
//!
//! - [`effect`] -- Active effects and their per-instance timing state
//! - [`stacking`] -- Stacking defaults and the resolution policy
//! - [`applier`] -- Applies payloads to players and NPCs through the stores
//! - [`registry`] -- Add/remove/query plus the game-tick and real-time passes
//! - [`events`] -- Effect lifecycle events
//! - [`ports`] -- Session and room store traits
//! - [`memory`] -- In-memory store implementations
//! - [`error`] -- Store errors

pub mod applier;
pub mod effect;
pub mod error;
pub mod events;
pub mod memory;
pub mod ports;
pub mod registry;
pub mod stacking;

pub use applier::{ApplyOutcome, DEFAULT_UNCONSCIOUS_THRESHOLD, EffectApplier};
pub use effect::ActiveEffect;
pub use error::PortError;
pub use events::EffectEvent;
pub use memory::{MemoryRoomStore, MemorySessionStore};
pub use ports::{RoomStore, SessionStore};
pub use registry::{EffectRegistry, TickPassSummary};
pub use stacking::{StackDecision, StackingTable};

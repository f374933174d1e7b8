//! Engine events broadcast to optional listeners (admin dashboards, logs,
//! tests).

use hearth_effects::EffectEvent;
use serde::Serialize;
use tokio::sync::broadcast;

/// Capacity of the engine event channel. Slow listeners lag and drop the
/// oldest events.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Something observable happened inside the engine.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// An effect was added, discarded, or removed.
    Effect(EffectEvent),
    /// A world tick finished its effect pass.
    Tick {
        /// The tick number.
        tick: u64,
    },
    /// Both stores saved successfully.
    Saved {
        /// The tick that triggered the save (the current tick for forced
        /// saves).
        tick: u64,
    },
}

/// Create the engine event channel.
pub fn channel() -> broadcast::Sender<EngineEvent> {
    broadcast::channel(EVENT_CHANNEL_CAPACITY).0
}

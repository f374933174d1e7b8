//! Hearth engine binary.
//!
//! Wires the world tick scheduler and the effect engine over an in-memory
//! demo world and runs until Ctrl-C.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `hearth-config.yaml` (defaults if absent)
//! 2. Initialize structured logging (tracing)
//! 3. Build the demo world and the runtime (effect actor, real-time driver)
//! 4. Seed demo effects and start the tick scheduler
//! 5. Wait for Ctrl-C, save once more, and shut down

mod demo;
mod error;

use std::path::Path;
use std::sync::Arc;

use hearth_core::combat::IdleCombat;
use hearth_core::config::EngineConfig;
use hearth_core::events::EngineEvent;
use hearth_core::runtime::WorldRuntime;
use hearth_effects::{RoomStore, SessionStore};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Path of the configuration file, relative to the working directory.
const CONFIG_PATH: &str = "hearth-config.yaml";

#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let config = EngineConfig::load(Path::new(CONFIG_PATH))?;

    // 2. Initialize structured logging.
    let level = config.logging.level.clone();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(true)
        .init();

    info!("hearth-engine starting");
    config.validate()?;
    info!(
        tick_interval_ms = config.ticker.tick_interval_ms,
        save_interval = config.ticker.save_interval,
        real_time_interval_ms = config.effects.real_time_interval_ms,
        stacking_overrides = config.effects.stacking_defaults.len(),
        "configuration loaded"
    );

    // 3. Build the world and the runtime.
    let world = demo::build();
    let runtime = WorldRuntime::new(
        config,
        Arc::clone(&world.sessions) as Arc<dyn SessionStore>,
        Arc::clone(&world.rooms) as Arc<dyn RoomStore>,
        Arc::new(IdleCombat),
    )
    .await;
    let listener = tokio::spawn(log_events(runtime.subscribe()));

    // 4. Seed effects and start ticking.
    demo::seed_effects(runtime.effects()).await;
    runtime.scheduler().start().await;

    // 5. Run until interrupted.
    tokio::signal::ctrl_c().await?;
    info!(tick = runtime.scheduler().tick_count(), "shutdown requested");

    runtime.scheduler().stop().await;
    let saved = runtime.scheduler().force_save().await;
    runtime.shutdown().await;
    listener.abort();
    saved?;

    info!("hearth-engine stopped");
    Ok(())
}

/// Log every engine event at debug level until the channel closes.
async fn log_events(mut rx: broadcast::Receiver<EngineEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => debug!(event = %json, "engine event"),
                Err(err) => warn!(error = %err, "unserializable engine event"),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "event listener lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

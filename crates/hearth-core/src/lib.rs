//! Tick scheduler, effect actor, and real-time driver for the Hearth engine.
//!
//! This crate runs the two clocks of the world on tokio: the discrete game
//! tick and the short real-time loop. Both feed a single effect actor that
//! owns the registry from `hearth-effects`.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `hearth-config.yaml`.
//! - [`clock`] -- World tick counter.
//! - [`combat`] -- [`CombatSystem`] port and [`IdleCombat`].
//! - [`effects`] -- The effect actor and its [`EffectHandle`].
//! - [`realtime`] -- The real-time driver.
//! - [`scheduler`] -- The world tick scheduler.
//! - [`events`] -- Engine events broadcast to listeners.
//! - [`runtime`] -- [`WorldRuntime`], the composition root.
//!
//! [`CombatSystem`]: combat::CombatSystem
//! [`IdleCombat`]: combat::IdleCombat
//! [`EffectHandle`]: effects::EffectHandle
//! [`WorldRuntime`]: runtime::WorldRuntime

pub mod clock;
pub mod combat;
pub mod config;
pub mod effects;
pub mod events;
pub mod realtime;
pub mod runtime;
pub mod scheduler;

mod task;

//! Configuration loading and typed config structures for the Hearth engine.
//!
//! The canonical configuration lives in `hearth-config.yaml` at the project
//! root. Every section and field has a default, so an empty file (or no file
//! at all, through [`EngineConfig::load`]) yields a runnable engine.

use std::collections::BTreeMap;
use std::path::Path;

use hearth_effects::{DEFAULT_UNCONSCIOUS_THRESHOLD, StackingTable};
use hearth_types::{EffectType, StackingBehavior};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Environment variable that overrides `ticker.tick_interval_ms`.
pub const TICK_INTERVAL_ENV: &str = "HEARTH_TICK_INTERVAL_MS";

/// Smallest accepted tick interval.
pub const MIN_TICK_INTERVAL_MS: u64 = 1_000;

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is outside its accepted range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration, mirroring `hearth-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// World tick cadence and save cadence.
    #[serde(default)]
    pub ticker: TickerConfig,

    /// Effect engine settings.
    #[serde(default)]
    pub effects: EffectsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `HEARTH_TICK_INTERVAL_MS` overrides `ticker.tick_interval_ms` when
    /// set to a valid number.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Like [`from_file`](Self::from_file), but a missing file yields the
    /// defaults (with environment overrides still applied).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::from_file(path);
        }
        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides in place.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(raw) = std::env::var(TICK_INTERVAL_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.ticker.tick_interval_ms = ms,
                Err(_) => warn!(var = TICK_INTERVAL_ENV, value = %raw, "ignoring unparsable override"),
            }
        }
    }

    /// Check every section for out-of-range values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ticker.validate()?;
        self.effects.validate()
    }
}

/// World tick cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerConfig {
    /// Milliseconds between world ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Save every this many ticks.
    #[serde(default = "default_save_interval")]
    pub save_interval: u64,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            save_interval: default_save_interval(),
        }
    }
}

impl TickerConfig {
    /// Reject a tick interval under one second or a zero save interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms < MIN_TICK_INTERVAL_MS {
            return Err(ConfigError::Invalid {
                field: "ticker.tick_interval_ms",
                reason: format!(
                    "{} is below the minimum of {MIN_TICK_INTERVAL_MS}",
                    self.tick_interval_ms
                ),
            });
        }
        if self.save_interval == 0 {
            return Err(ConfigError::Invalid {
                field: "ticker.save_interval",
                reason: "must be at least 1".to_owned(),
            });
        }
        Ok(())
    }

    /// Return this config with the fields set in `update` replaced.
    #[must_use]
    pub const fn merged(self, update: TickerConfigUpdate) -> Self {
        Self {
            tick_interval_ms: match update.tick_interval_ms {
                Some(ms) => ms,
                None => self.tick_interval_ms,
            },
            save_interval: match update.save_interval {
                Some(every) => every,
                None => self.save_interval,
            },
        }
    }
}

/// Partial ticker change requested by an administrator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerConfigUpdate {
    /// New tick interval, if changing.
    #[serde(default)]
    pub tick_interval_ms: Option<u64>,

    /// New save interval, if changing.
    #[serde(default)]
    pub save_interval: Option<u64>,
}

/// Effect engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EffectsConfig {
    /// Period of the real-time pass in milliseconds.
    #[serde(default = "default_real_time_interval_ms")]
    pub real_time_interval_ms: u64,

    /// Lowest health a player can be pushed to by effect damage.
    #[serde(default = "default_unconscious_threshold")]
    pub unconscious_threshold: i32,

    /// Capacity of the effect actor's command queue.
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,

    /// Per-type stacking overrides layered on the built-in defaults.
    #[serde(default)]
    pub stacking_defaults: BTreeMap<EffectType, StackingBehavior>,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            real_time_interval_ms: default_real_time_interval_ms(),
            unconscious_threshold: default_unconscious_threshold(),
            command_buffer: default_command_buffer(),
            stacking_defaults: BTreeMap::new(),
        }
    }
}

impl EffectsConfig {
    /// The stacking table these settings describe.
    pub fn stacking_table(&self) -> StackingTable {
        StackingTable::with_overrides(&self.stacking_defaults)
    }

    /// Reject zero periods and buffers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.real_time_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "effects.real_time_interval_ms",
                reason: "must be at least 1".to_owned(),
            });
        }
        if self.command_buffer == 0 {
            return Err(ConfigError::Invalid {
                field: "effects.command_buffer",
                reason: "must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_tick_interval_ms() -> u64 {
    6_000
}

const fn default_save_interval() -> u64 {
    10
}

const fn default_real_time_interval_ms() -> u64 {
    250
}

const fn default_unconscious_threshold() -> i32 {
    DEFAULT_UNCONSCIOUS_THRESHOLD
}

const fn default_command_buffer() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.ticker.tick_interval_ms, 6_000);
        assert_eq!(config.ticker.save_interval, 10);
        assert_eq!(config.effects.real_time_interval_ms, 250);
        assert_eq!(config.effects.unconscious_threshold, -10);
        assert_eq!(config.effects.command_buffer, 256);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r"
ticker:
  tick_interval_ms: 3000
  save_interval: 5
effects:
  real_time_interval_ms: 100
  unconscious_threshold: -20
  command_buffer: 64
  stacking_defaults:
    poison: refresh
    stun: stack_duration
logging:
  level: debug
";
        let config = EngineConfig::parse(yaml).unwrap();
        assert_eq!(config.ticker.save_interval, 5);
        assert_eq!(config.effects.unconscious_threshold, -20);
        assert_eq!(config.effects.command_buffer, 64);
        assert_eq!(config.logging.level, "debug");

        let table = config.effects.stacking_table();
        assert_eq!(table.default_for(EffectType::Poison), Some(StackingBehavior::Refresh));
        assert_eq!(
            table.default_for(EffectType::Stun),
            Some(StackingBehavior::StackDuration)
        );
        assert_eq!(
            table.default_for(EffectType::Bleed),
            Some(StackingBehavior::StackIntensity)
        );
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = EngineConfig::parse("ticker:\n  save_interval: 3\n").unwrap();
        assert_eq!(config.ticker.save_interval, 3);
        assert_eq!(config.effects.real_time_interval_ms, 250);
    }

    #[test]
    fn parse_empty_yaml() {
        assert!(EngineConfig::parse("").is_ok());
    }

    #[test]
    fn unknown_effect_type_is_rejected() {
        let yaml = "effects:\n  stacking_defaults:\n    frostbite: ignore\n";
        assert!(matches!(
            EngineConfig::parse(yaml),
            Err(ConfigError::Yaml { .. })
        ));
    }

    #[test]
    fn ticker_validation() {
        let too_fast = TickerConfig {
            tick_interval_ms: 999,
            save_interval: 1,
        };
        assert!(matches!(
            too_fast.validate(),
            Err(ConfigError::Invalid {
                field: "ticker.tick_interval_ms",
                ..
            })
        ));

        let never_saves = TickerConfig {
            tick_interval_ms: 1_000,
            save_interval: 0,
        };
        assert!(never_saves.validate().is_err());

        let ok = TickerConfig {
            tick_interval_ms: 1_000,
            save_interval: 1,
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn effects_validation() {
        let config = EffectsConfig {
            command_buffer: 0,
            ..EffectsConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn update_merges_only_set_fields() {
        let base = TickerConfig::default();
        let merged = base.merged(TickerConfigUpdate {
            tick_interval_ms: Some(2_000),
            save_interval: None,
        });
        assert_eq!(merged.tick_interval_ms, 2_000);
        assert_eq!(merged.save_interval, 10);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("does-not-exist.yaml");
        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.effects, EffectsConfig::default());
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("hearth-config.yaml");
        if path.exists() {
            let config = EngineConfig::from_file(&path);
            assert!(config.is_ok(), "failed to load project config: {config:?}");
        }
    }
}

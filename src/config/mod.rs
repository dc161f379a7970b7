//! Process-start configuration for the decision pipeline.
//!
//! Follows a `config::init()`/`config::get()` pattern:
//! hard rules, per-disaster-type soft-scoring weights, and the assorted
//! tuning constants in [`defaults`] are loaded once at process start and
//! read thereafter through a global accessor. Caches populated this way are
//! read-only for the lifetime of the process (spec §5 "Shared resources").
//!
//! ## Loading order
//!
//! 1. `TRIAGE_CONFIG` environment variable (path to TOML file)
//! 2. `triage_config.toml` in the current working directory
//! 3. Built-in defaults

pub mod defaults;
mod hard_rules;

pub use hard_rules::{default_hard_rules, HardRule};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::{EvaluationWeights, PipelineError};

/// Root configuration for one pipeline process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_hard_rules")]
    pub hard_rules: Vec<HardRule>,

    /// Default soft-scoring weights, used when no per-disaster-type
    /// override and no per-request override is present.
    #[serde(default)]
    pub default_weights: EvaluationWeights,

    /// Per-disaster-type weight overrides keyed by `disaster_type` string
    /// (spec §4.6: "fetched from a config service keyed on disaster_type").
    #[serde(default)]
    pub weights_by_disaster_type: HashMap<String, EvaluationWeights>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            hard_rules: default_hard_rules(),
            default_weights: EvaluationWeights::defaults(),
            weights_by_disaster_type: HashMap::new(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration using the standard search order; falls back to
    /// built-in defaults on any read/parse failure rather than aborting
    /// process start, `WellConfig::load()`-style leniency.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("TRIAGE_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "loaded pipeline config from TRIAGE_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "failed to load config from TRIAGE_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "TRIAGE_CONFIG points to non-existent file, falling back");
            }
        }

        let default_path = Path::new("triage_config.toml");
        if default_path.exists() {
            match Self::load_from_file(default_path) {
                Ok(config) => {
                    info!("loaded pipeline config from ./triage_config.toml");
                    return config;
                }
                Err(e) => warn!(error = %e, "failed to parse ./triage_config.toml, falling back to defaults"),
            }
        }

        info!("no pipeline config file found, using built-in defaults");
        Self::default()
    }

    fn load_from_file(path: &Path) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::ConfigError(format!("reading {}: {e}", path.display())))?;
        let config: Self = toml::from_str(&text)
            .map_err(|e| PipelineError::ConfigError(format!("parsing {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// `ConfigError` at load time is fatal to process start (spec §7).
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.default_weights.validate()?;
        for (disaster_type, weights) in &self.weights_by_disaster_type {
            weights
                .validate()
                .map_err(|e| PipelineError::ConfigError(format!("weights for {disaster_type}: {e}")))?;
        }
        Ok(())
    }

    /// `GetEvaluationWeights(disaster_type)` adapter contract (spec §6).
    pub fn weights_for(&self, disaster_type: &str) -> EvaluationWeights {
        self.weights_by_disaster_type
            .get(disaster_type)
            .copied()
            .unwrap_or(self.default_weights)
    }
}

static PIPELINE_CONFIG: OnceLock<PipelineConfig> = OnceLock::new();

/// Initialize the global pipeline configuration. Must be called exactly
/// once before any call to [`get`].
pub fn init(config: PipelineConfig) {
    if PIPELINE_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once — ignoring");
    }
}

/// Get a reference to the global pipeline configuration.
///
/// Panics if `init()` has not been called — a missing config is a fatal
/// startup bug, not a recoverable per-request condition.
pub fn get() -> &'static PipelineConfig {
    PIPELINE_CONFIG
        .get()
        .expect("config::get() called before config::init() — this is a startup bug")
}

pub fn is_initialized() -> bool {
    PIPELINE_CONFIG.get().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn weights_for_unknown_disaster_type_falls_back_to_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.weights_for("volcano"), config.default_weights);
    }

    #[test]
    fn weights_for_known_disaster_type_uses_override() {
        let mut config = PipelineConfig::default();
        let custom = EvaluationWeights {
            success_rate: 0.5,
            response_time: 0.2,
            coverage_rate: 0.2,
            risk: 0.05,
            redundancy: 0.05,
        };
        config.weights_by_disaster_type.insert("flood".to_string(), custom);
        assert_eq!(config.weights_for("flood"), custom);
    }

    #[test]
    fn malformed_weights_fail_validation() {
        let mut config = PipelineConfig::default();
        config.default_weights.risk = 5.0;
        assert!(config.validate().is_err());
    }
}

//! Greedy selection configuration with builder pattern.
//!
//! # Example
//!
//! ```
//! use greedyshap::explainability::backend::BackendKind;
//! use greedyshap::explainability::greedy::{GreedyConfig, Level};
//!
//! // All defaults
//! let config = GreedyConfig::builder().build().unwrap();
//! assert_eq!(config.n_steps, 10);
//!
//! let config = GreedyConfig::builder()
//!     .n_steps(5)
//!     .corr_threshold(0.9)
//!     .level(Level::Group)
//!     .backend(BackendKind::Enumeration { background_samples: Some(50) })
//!     .build()
//!     .unwrap();
//! ```

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::explainability::backend::BackendKind;
use crate::logger::Verbosity;

/// Granularity of the players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Level {
    /// One player per input column.
    #[default]
    Feature,
    /// One player per declared group; unassigned inputs are singletons.
    Group,
}

/// Data the correlation gate is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CorrelationData {
    /// The explained instances.
    #[default]
    Explain,
    /// The background set.
    Background,
}

/// Configuration of a greedy iterative selection run.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct GreedyConfig {
    /// Maximum number of selected players. Default: 10.
    #[builder(default = 10)]
    pub n_steps: usize,

    /// Stop once the best free player's mean |attribution| falls below this.
    /// Default: 0.01.
    #[builder(default = 0.01)]
    pub threshold: f64,

    /// Free players with `|correlation| > corr_threshold` to the winner are
    /// conditioned alongside it. Default: 0.8.
    #[builder(default = 0.8)]
    pub corr_threshold: f64,

    /// Attribution backend. Default: `Auto`.
    #[builder(default)]
    pub backend: BackendKind,

    /// Feature- or group-level players. Default: `Feature`.
    #[builder(default)]
    pub level: Level,

    /// Which data the correlation gate uses. Default: `Explain`.
    #[builder(default)]
    pub correlation_data: CorrelationData,

    /// Model output to explain. Default: 0.
    #[builder(default)]
    pub output: usize,

    // === Resource control ===
    /// Number of threads. 0 uses all available cores, 1 runs sequentially.
    #[builder(default)]
    pub n_threads: usize,

    // === Logging ===
    /// Verbosity level. Default: `Silent`.
    #[builder(default)]
    pub verbosity: Verbosity,
}

/// Custom finishing function that validates the config.
impl<S: greedy_config_builder::IsComplete> GreedyConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any parameter is invalid:
    /// - `n_steps == 0`
    /// - `threshold` negative or not finite
    /// - `corr_threshold` outside `[0, 1]`
    pub fn build(self) -> Result<GreedyConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl GreedyConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_steps == 0 {
            return Err(ConfigError::InvalidNSteps(self.n_steps));
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }
        if !(0.0..=1.0).contains(&self.corr_threshold) {
            return Err(ConfigError::InvalidCorrThreshold(self.corr_threshold));
        }
        if let BackendKind::Enumeration { background_samples: Some(0) } = self.backend {
            return Err(ConfigError::InvalidBackgroundSamples);
        }
        Ok(())
    }
}

impl Default for GreedyConfig {
    fn default() -> Self {
        Self::builder().__build_internal()
    }
}

// =============================================================================
// Tests
// =============================================================================

//! greedyshap: exact Shapley attribution with redundancy-aware greedy selection.
//!
//! Per-input attribution splits credit evenly among duplicated or strongly
//! correlated inputs, hiding the real driver. This crate computes exact
//! interventional Shapley values over arbitrary players (single inputs or
//! named groups) and runs a greedy iterative selector that repeatedly picks
//! the highest-credit player, conditions it and its correlates out, and
//! recomputes.
//!
//! # Key Types
//!
//! - [`Predictor`] - the model capability; [`LinearModel`], [`Forest`] and
//!   [`FnModel`] ship with the crate
//! - [`PlayerSet`] / [`GroupPartition`] - players and groupings
//! - [`ExactShapley`] / [`CoalitionValue`] - exact enumeration
//! - [`GreedyConfig`] / [`GreedySelector`] - greedy selection
//!
//! # Example
//!
//! ```
//! use greedyshap::{GreedyConfig, LinearModel, greedy_iterative_shapley};
//! use ndarray::array;
//!
//! let model = LinearModel::from_coefficients(&[3.0, 1.0], 0.0);
//! let background = array![[0.0, 0.0], [1.0, 1.0]];
//! let explain = array![[1.0, 0.0], [0.0, 1.0]];
//!
//! let config = GreedyConfig::builder().corr_threshold(1.0).build().unwrap();
//! let steps = greedy_iterative_shapley(&model, background.view(), explain.view(), None, &config).unwrap();
//! assert_eq!(steps[0].player_name, "F0");
//! assert_eq!(steps[1].player_name, "F1");
//! ```

// Re-export approx traits for users who want to compare attributions
pub use approx;

pub mod error;
pub mod explainability;
pub mod logger;
pub mod model;
pub mod players;
pub mod testing;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use error::{CapabilityError, ConfigError, ExplainError};

pub use model::{FnModel, Forest, LinearModel, ModelStructure, Node, Predictor, Tree};

pub use players::{Coalition, GroupPartition, MAX_EXACT_PLAYERS, Player, PlayerId, PlayerSet};

pub use explainability::{
    AttributionBackend, BackendKind, CoalitionValue, ConditioningState, CorrelationData, ExactShapley,
    GreedyConfig, GreedySelector, Level, SelectionReport, ShapValues, ShapleyResult, StepResult, StopReason,
    direct_group_shapley, greedy_iterative, greedy_iterative_shapley, sum_group_shap,
};

pub use logger::Verbosity;

pub use utils::{Parallelism, run_with_threads};

//! Attribution and selection.
//!
//! - [`shap`]: coalition value function, conditioning and exact Shapley
//! - [`backend`]: per-instance attribution backends and their selection
//! - [`correlation`]: association statistics and the correlation gate
//! - [`grouped`]: group-level attribution by summing or by direct play
//! - [`greedy`]: the greedy iterative selector

pub mod backend;
pub mod correlation;
pub mod greedy;
pub mod grouped;
pub mod shap;

pub use backend::{AttributionBackend, BackendKind, select_backend};
pub use correlation::{Association, AssociationMatrix, CorrelationGate, Pearson};
pub use greedy::{
    CorrelationData, GreedyConfig, GreedySelector, Level, SelectionReport, StepResult, StopReason,
    greedy_iterative, greedy_iterative_shapley,
};
pub use grouped::{direct_group_shapley, sum_group_shap};
pub use shap::{CoalitionValue, ConditioningState, ExactShapley, ShapValues, ShapleyResult};

//! Redundancy-aware greedy selection.
//!
//! - [`GreedyConfig`]: validated run configuration (`bon` builder)
//! - [`GreedySelector`]: the selection loop, with optional group partition,
//!   custom association statistic and external cancellation
//! - [`greedy_iterative_shapley`], [`greedy_iterative`]: one-call entry points

mod config;
mod selector;

pub use config::{CorrelationData, GreedyConfig, GreedyConfigBuilder, Level};
pub use selector::{
    GreedySelector, SelectionReport, StepResult, StopReason, greedy_iterative, greedy_iterative_shapley,
};

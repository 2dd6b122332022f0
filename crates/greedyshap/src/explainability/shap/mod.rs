//! SHAP (SHapley Additive exPlanations) value computation.
//!
//! This module provides the coalition value function, the conditioning
//! snapshot it applies, and the exact enumeration over a player set.

mod coalition;
mod conditioning;
mod exact;
mod values;

pub use coalition::CoalitionValue;
pub use conditioning::ConditioningState;
pub use exact::{
    ExactShapley, ShapleyResult, binomial, check_player_count, shapley_from_table, shapley_weights,
};
pub use values::ShapValues;

//! Group-level attribution.
//!
//! Two ways to attribute a [`GroupPartition`]:
//!
//! - [`sum_group_shap`] sums already-computed per-input values inside each
//!   group. Cheap, but inherits the per-input game's splitting of credit
//!   among correlated members.
//! - [`direct_group_shapley`] plays the game with the groups themselves as
//!   players, so members always enter and leave a coalition together.
//!
//! Both return per-instance values over the same player order (declared
//! groups, then unassigned inputs as singletons); use
//! [`ShapValues::mean_abs_by_player`] for a group → score mapping.

use ndarray::ArrayView2;

use crate::error::{ConfigError, ExplainError};
use crate::explainability::shap::{CoalitionValue, ExactShapley, ShapValues};
use crate::model::{Predictor, check_usable};
use crate::players::{GroupPartition, PlayerSet, resolve_feature_names};
use crate::utils::Parallelism;

/// Sum per-input attributions within each group.
///
/// `per_input` must hold one player per input column, named after the
/// features; those names label unassigned singleton groups. Base values are
/// carried over unchanged.
///
/// # Errors
///
/// Returns [`ConfigError`] if the partition is not valid over the inputs.
pub fn sum_group_shap(per_input: &ShapValues, partition: &GroupPartition) -> Result<ShapValues, ConfigError> {
    let players = PlayerSet::grouped(per_input.players(), partition)?;
    let n_samples = per_input.n_samples();
    let mut grouped = ShapValues::zeros(n_samples, players.names());
    for sample in 0..n_samples {
        for (input, &v) in per_input.sample(sample).iter().enumerate() {
            grouped.add(sample, players.owner_of(input), v);
        }
        grouped.set_base_value(sample, per_input.base_value(sample));
    }
    Ok(grouped)
}

/// Exact Shapley values with the groups as players.
///
/// # Errors
///
/// Fails on an invalid partition or data shape, or when the partition yields
/// more players than exact enumeration supports.
pub fn direct_group_shapley(
    model: &dyn Predictor,
    background: ArrayView2<'_, f64>,
    explain: ArrayView2<'_, f64>,
    partition: &GroupPartition,
    feature_names: Option<&[String]>,
    parallelism: Parallelism,
) -> Result<ShapValues, ExplainError> {
    check_usable(model)?;
    let n_features = model.n_features();
    if explain.nrows() == 0 {
        return Err(ConfigError::EmptyData("explain").into());
    }
    if explain.ncols() != n_features {
        return Err(ConfigError::DimensionMismatch {
            what: "explain",
            expected: n_features,
            actual: explain.ncols(),
        }
        .into());
    }
    let names = resolve_feature_names(feature_names, n_features)?;
    let players = PlayerSet::grouped(&names, partition)?;
    let value = CoalitionValue::new(model, background.reborrow(), &players)?;
    let shapley = ExactShapley::new(parallelism);

    let mut shap = ShapValues::zeros(explain.nrows(), players.names());
    for (sample, row) in explain.rows().into_iter().enumerate() {
        let instance = row.to_vec();
        let result = shapley.explain(&value, &instance)?;
        shap.set_sample(sample, result.values(), result.base_value());
    }
    Ok(shap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FnModel, LinearModel};
    use crate::players::default_feature_names;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn sums_members_and_keeps_singletons() {
        let mut per_input = ShapValues::zeros(1, default_feature_names(4));
        per_input.set_sample(0, &[1.0, 2.0, 3.0, 4.0], 0.5);
        let partition = GroupPartition::new().with_group("a", [1, 3]);

        let grouped = sum_group_shap(&per_input, &partition).unwrap();
        assert_eq!(grouped.players(), &["a", "F0", "F2"]);
        assert_eq!(grouped.sample(0), &[6.0, 1.0, 3.0]);
        assert_eq!(grouped.base_value(0), 0.5);
    }

    #[test]
    fn sum_rejects_overlap() {
        let per_input = ShapValues::zeros(1, default_feature_names(2));
        let partition = GroupPartition::new().with_group("a", [0]).with_group("b", [0, 1]);
        assert!(matches!(
            sum_group_shap(&per_input, &partition),
            Err(ConfigError::OverlappingGroups { input: 0, .. })
        ));
    }

    #[test]
    fn direct_keeps_interaction_inside_group() {
        // Pure interaction between x0 and x1; x2 additive.
        let model = FnModel::new(3, |x: &[f64]| x[0] * x[1] + x[2]);
        let background = array![[0.0, 0.0, 0.0]];
        let explain = array![[2.0, 3.0, 1.0]];
        let partition = GroupPartition::new().with_group("pair", [0, 1]);

        let shap = direct_group_shapley(
            &model,
            background.view(),
            explain.view(),
            &partition,
            None,
            Parallelism::Sequential,
        )
        .unwrap();
        assert_eq!(shap.players(), &["pair", "F2"]);
        assert_abs_diff_eq!(shap.get(0, 0), 6.0, epsilon = 1e-12);
        assert_abs_diff_eq!(shap.get(0, 1), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn direct_checks_shapes() {
        let model = LinearModel::from_coefficients(&[1.0, 1.0], 0.0);
        let background = array![[0.0, 0.0]];
        let explain = array![[1.0, 2.0, 3.0]];
        let err = direct_group_shapley(
            &model,
            background.view(),
            explain.view(),
            &GroupPartition::new(),
            None,
            Parallelism::Sequential,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ExplainError::Config(ConfigError::DimensionMismatch { what: "explain", .. })
        ));
    }
}

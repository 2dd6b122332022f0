//! Model-agnostic exact enumeration backend.

use ndarray::{Array2, ArrayView2, Axis};

use super::{AttributionBackend, AttributionRequest, active_players};
use crate::error::{CapabilityError, ExplainError};
use crate::explainability::shap::{
    CoalitionValue, ShapValues, check_player_count, shapley_from_table,
};
use crate::model::Predictor;
use crate::players::PlayerSet;

/// Exact interventional Shapley values for any [`Predictor`].
///
/// Enumerates every coalition of the players that still have a free input;
/// fully conditioned players are dummies and receive zero without being
/// enumerated. Cost per instance is `O(2^n_active * background_rows)` model
/// calls.
///
/// `background_samples` trades accuracy for speed by evaluating coalitions
/// against an evenly strided subset of the background rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnumerationBackend {
    background_samples: Option<usize>,
}

impl EnumerationBackend {
    pub fn new(background_samples: Option<usize>) -> Self {
        Self { background_samples }
    }

    /// Evenly strided subset of `background`, or the full background.
    fn subsample(&self, background: ArrayView2<'_, f64>) -> Option<Array2<f64>> {
        let n_rows = background.nrows();
        match self.background_samples {
            Some(k) if k > 0 && k < n_rows => {
                let rows: Vec<usize> = (0..k).map(|i| i * n_rows / k).collect();
                Some(background.select(Axis(0), &rows))
            }
            _ => None,
        }
    }
}

impl AttributionBackend for EnumerationBackend {
    fn name(&self) -> &'static str {
        "enumeration"
    }

    fn check(&self, _model: &dyn Predictor, players: &PlayerSet) -> Result<(), CapabilityError> {
        check_player_count(players.len())
    }

    fn attribute(&self, request: &AttributionRequest<'_>) -> Result<ShapValues, ExplainError> {
        let players = request.players;
        let active = active_players(players, request.conditioning);
        check_player_count(active.len())?;

        let sampled = self.subsample(request.background.reborrow());
        let background = sampled.as_ref().map_or(request.background.reborrow(), |b| b.view());
        let value = CoalitionValue::new(request.model, background, players)?
            .with_conditioning(request.conditioning)
            .with_output(request.output)?;

        let n_samples = request.instances.nrows();
        let per_instance = request.parallelism.maybe_par_map(0..n_samples, |sample| {
            let row = request.instances.row(sample);
            let instance = row.to_vec();
            let table = value.restricted_table(&instance, &active, request.parallelism)?;
            let phi = shapley_from_table(active.len(), &table, request.parallelism);
            Ok::<_, ExplainError>((phi, table[0]))
        });

        let mut shap = ShapValues::zeros(n_samples, players.names());
        for (sample, result) in per_instance.into_iter().enumerate() {
            let (phi, base_value) = result?;
            for (&player, &v) in active.iter().zip(&phi) {
                shap.set(sample, player, v);
            }
            shap.set_base_value(sample, base_value);
        }
        Ok(shap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explainability::shap::ConditioningState;
    use crate::model::{FnModel, LinearModel};
    use crate::players::default_feature_names;
    use crate::utils::Parallelism;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn request<'a>(
        model: &'a dyn Predictor,
        background: ArrayView2<'a, f64>,
        instances: ArrayView2<'a, f64>,
        players: &'a PlayerSet,
        conditioning: &'a ConditioningState,
    ) -> AttributionRequest<'a> {
        AttributionRequest {
            model,
            background,
            instances,
            players,
            conditioning,
            output: 0,
            parallelism: Parallelism::Sequential,
        }
    }

    #[test]
    fn linear_ground_truth() {
        let model = LinearModel::from_coefficients(&[3.0, 1.0], 0.0);
        let background = array![[-1.0, 2.0], [1.0, -2.0]];
        let instances = array![[5.0, 2.0]];
        let players = PlayerSet::features(&default_feature_names(2));
        let state = ConditioningState::new();

        let shap = EnumerationBackend::default()
            .attribute(&request(&model, background.view(), instances.view(), &players, &state))
            .unwrap();

        assert_abs_diff_eq!(shap.get(0, 0), 15.0, epsilon = 1e-12);
        assert_abs_diff_eq!(shap.get(0, 1), 2.0, epsilon = 1e-12);
        assert!(shap.verify(&[17.0], 1e-12));
    }

    #[test]
    fn conditioned_players_get_zero() {
        let model = FnModel::new(2, |x: &[f64]| x[0] * x[1]);
        let background = array![[0.0, 0.0], [1.0, 1.0]];
        let instances = array![[2.0, 3.0], [4.0, 5.0]];
        let players = PlayerSet::features(&default_feature_names(2));
        let state = ConditioningState::new().fix([0]);

        let shap = EnumerationBackend::default()
            .attribute(&request(&model, background.view(), instances.view(), &players, &state))
            .unwrap();

        assert_eq!(shap.get(0, 0), 0.0);
        assert_eq!(shap.get(1, 0), 0.0);
        // x0 pinned per instance: phi_1 = x0 * (x1 - mean(b1))
        assert_abs_diff_eq!(shap.get(0, 1), 2.0 * 2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(shap.get(1, 1), 4.0 * 4.5, epsilon = 1e-12);
    }

    #[test]
    fn subsample_is_strided() {
        let background = Array2::from_shape_fn((10, 1), |(i, _)| i as f64);
        let sampled = EnumerationBackend::new(Some(5)).subsample(background.view()).unwrap();
        assert_eq!(sampled.column(0).to_vec(), vec![0.0, 2.0, 4.0, 6.0, 8.0]);
        assert!(EnumerationBackend::new(Some(20)).subsample(background.view()).is_none());
    }

    #[test]
    fn rejects_too_many_players() {
        let model = FnModel::new(25, |x: &[f64]| x.iter().sum());
        let players = PlayerSet::features(&default_feature_names(25));
        assert!(matches!(
            EnumerationBackend::default().check(&model, &players),
            Err(CapabilityError::TooManyPlayers { n_players: 25, .. })
        ));
    }
}

//! Closed-form attribution for linear models.
//!
//! For a linear model the interventional Shapley value of a player is
//! `phi_p = sum over j in p of w[j] * (x[j] - mean[j])`, where `mean` is
//! the column mean of the background after conditioning. A fixed column's
//! mean equals `x[j]`, so fully conditioned players get exactly zero.

use ndarray::Axis;

use super::{AttributionBackend, AttributionRequest};
use crate::error::{CapabilityError, ConfigError, ExplainError};
use crate::explainability::shap::ShapValues;
use crate::model::{LinearModel, ModelStructure, Predictor};
use crate::players::PlayerSet;

/// Exact linear attribution in `O(n_features)` per instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearBackend;

impl LinearBackend {
    fn linear<'m>(model: &'m dyn Predictor) -> Result<&'m LinearModel, CapabilityError> {
        match model.structure() {
            ModelStructure::Linear(linear) => Ok(linear),
            other => Err(CapabilityError::BackendUnsupported {
                backend: "linear",
                model: other.family(),
            }),
        }
    }
}

impl AttributionBackend for LinearBackend {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn check(&self, model: &dyn Predictor, _players: &PlayerSet) -> Result<(), CapabilityError> {
        Self::linear(model).map(|_| ())
    }

    fn attribute(&self, request: &AttributionRequest<'_>) -> Result<ShapValues, ExplainError> {
        let model = Self::linear(request.model)?;
        let output = request.output;
        let players = request.players;
        let means = request
            .background
            .mean_axis(Axis(0))
            .ok_or(ConfigError::EmptyData("background"))?;

        let n_samples = request.instances.nrows();
        let mut shap = ShapValues::zeros(n_samples, players.names());
        for (sample, x) in request.instances.rows().into_iter().enumerate() {
            let mut base = model.bias(output);
            for (j, (&xj, &mean)) in x.iter().zip(means.iter()).enumerate() {
                let weight = model.weight(j, output);
                if request.conditioning.is_fixed(j) {
                    base += weight * xj;
                } else {
                    base += weight * mean;
                    shap.add(sample, players.owner_of(j), weight * (xj - mean));
                }
            }
            shap.set_base_value(sample, base);
        }
        Ok(shap)
    }
}

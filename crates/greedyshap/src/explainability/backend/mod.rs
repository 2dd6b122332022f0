//! Attribution backends.
//!
//! A backend turns (model, background, instances, players, conditioning)
//! into per-instance, per-player attributions. Three implementations share
//! the [`AttributionBackend`] contract:
//!
//! - [`EnumerationBackend`]: model-agnostic exact enumeration of the
//!   interventional coalition game, optionally over a deterministic
//!   sub-sample of the background.
//! - [`TreeBackend`]: exact interventional values for tree ensembles via
//!   path traversal, polynomial in tree size.
//! - [`LinearBackend`]: closed form for linear models.
//!
//! [`select_backend`] implements the selection policy: structure-aware
//! backends for models that expose structure, enumeration otherwise.

mod enumeration;
mod linear;
mod tree;

pub use enumeration::EnumerationBackend;
pub use linear::LinearBackend;
pub use tree::TreeBackend;

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use crate::error::{CapabilityError, ExplainError};
use crate::explainability::shap::{ConditioningState, ShapValues};
use crate::model::{ModelStructure, Predictor};
use crate::players::PlayerSet;
use crate::utils::Parallelism;

/// Everything a backend needs for one attribution pass.
///
/// The caller has validated dimensions: `background` and `instances` have
/// `model.n_features()` columns, `players` covers exactly those columns, and
/// `output < model.n_outputs()`.
#[derive(Clone, Copy)]
pub struct AttributionRequest<'a> {
    pub model: &'a dyn Predictor,
    pub background: ArrayView2<'a, f64>,
    pub instances: ArrayView2<'a, f64>,
    pub players: &'a PlayerSet,
    pub conditioning: &'a ConditioningState,
    pub output: usize,
    pub parallelism: Parallelism,
}

/// Capability interface for per-instance attribution.
pub trait AttributionBackend: Send + Sync {
    /// Short backend name for logs and errors.
    fn name(&self) -> &'static str;

    /// Check up front that the backend can serve this model and player set.
    fn check(&self, model: &dyn Predictor, players: &PlayerSet) -> Result<(), CapabilityError>;

    /// Attribute every instance of the request.
    ///
    /// Players whose inputs are all conditioned receive exactly zero.
    fn attribute(&self, request: &AttributionRequest<'_>) -> Result<ShapValues, ExplainError>;
}

/// Which backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackendKind {
    /// Tree for forests, Linear for linear models, Enumeration otherwise.
    #[default]
    Auto,
    /// Model-agnostic enumeration. `background_samples` caps the number of
    /// background rows used (deterministic stride); `None` uses all rows.
    Enumeration { background_samples: Option<usize> },
    /// Interventional tree-path computation. Requires a forest.
    Tree,
    /// Closed-form linear attribution. Requires a linear model.
    Linear,
}

/// Resolve a [`BackendKind`] against the model's exposed structure.
///
/// # Errors
///
/// Returns [`CapabilityError::BackendUnsupported`] when a structure-aware
/// backend is requested for a model that does not expose that structure.
pub fn select_backend(
    kind: BackendKind,
    model: &dyn Predictor,
) -> Result<Box<dyn AttributionBackend>, CapabilityError> {
    let structure = model.structure();
    let backend: Box<dyn AttributionBackend> = match (kind, structure) {
        (BackendKind::Auto | BackendKind::Tree, ModelStructure::Forest(_)) => Box::new(TreeBackend),
        (BackendKind::Auto | BackendKind::Linear, ModelStructure::Linear(_)) => {
            Box::new(LinearBackend)
        }
        (BackendKind::Auto, ModelStructure::Opaque) => Box::new(EnumerationBackend::default()),
        (BackendKind::Enumeration { background_samples }, _) => {
            Box::new(EnumerationBackend::new(background_samples))
        }
        (BackendKind::Tree, other) => {
            return Err(CapabilityError::BackendUnsupported {
                backend: TreeBackend.name(),
                model: other.family(),
            });
        }
        (BackendKind::Linear, other) => {
            return Err(CapabilityError::BackendUnsupported {
                backend: LinearBackend.name(),
                model: other.family(),
            });
        }
    };
    Ok(backend)
}

/// Player ids that still have at least one free input.
pub(crate) fn active_players(players: &PlayerSet, conditioning: &ConditioningState) -> Vec<usize> {
    (0..players.len())
        .filter(|&p| {
            players
                .player(p)
                .inputs()
                .iter()
                .any(|&input| !conditioning.is_fixed(input))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FnModel, Forest, LinearModel, Tree};
    use crate::players::{GroupPartition, default_feature_names};

    #[test]
    fn auto_selects_by_structure() {
        let linear = LinearModel::from_coefficients(&[1.0], 0.0);
        let mut forest = Forest::new(1);
        forest.push_tree(Tree::stump(0, 0.0, 0.0, 1.0)).unwrap();
        let opaque = FnModel::new(1, |x: &[f64]| x[0]);

        assert_eq!(select_backend(BackendKind::Auto, &linear).unwrap().name(), "linear");
        assert_eq!(select_backend(BackendKind::Auto, &forest).unwrap().name(), "tree");
        assert_eq!(select_backend(BackendKind::Auto, &opaque).unwrap().name(), "enumeration");
    }

    #[test]
    fn enumeration_accepts_any_model() {
        let linear = LinearModel::from_coefficients(&[1.0], 0.0);
        let kind = BackendKind::Enumeration { background_samples: Some(10) };
        assert_eq!(select_backend(kind, &linear).unwrap().name(), "enumeration");
    }

    #[test]
    fn structure_backends_reject_opaque_models() {
        let opaque = FnModel::new(1, |x: &[f64]| x[0]);
        assert_eq!(
            select_backend(BackendKind::Tree, &opaque).err(),
            Some(CapabilityError::BackendUnsupported { backend: "tree", model: "opaque" })
        );
        assert_eq!(
            select_backend(BackendKind::Linear, &opaque).err(),
            Some(CapabilityError::BackendUnsupported { backend: "linear", model: "opaque" })
        );
    }

    #[test]
    fn active_players_skip_fully_fixed_groups() {
        let players = PlayerSet::grouped(
            &default_feature_names(4),
            &GroupPartition::new().with_group("g", [0, 1]),
        )
        .unwrap();
        // players: g = {0, 1}, F2, F3
        let state = ConditioningState::new().fix([0, 3]);
        assert_eq!(active_players(&players, &state), vec![0, 1]);

        let state = state.fix([1]);
        assert_eq!(active_players(&players, &state), vec![1]);
    }
}

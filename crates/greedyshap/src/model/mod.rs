//! Prediction capabilities consumed by the attribution engine.
//!
//! The engine treats a model as an opaque [`Predictor`]. Models that expose
//! exploitable structure (linear coefficients, decision trees) advertise it
//! through [`Predictor::structure`], which lets the backend selection policy
//! pick a structure-aware backend.
//!
//! Concrete capabilities shipped with the crate:
//! - [`LinearModel`] - weights + bias, one column per output
//! - [`Forest`] / [`Tree`] - numeric-split decision tree ensembles
//! - [`FnModel`] - any closure `&[f64] -> f64`

mod linear;
mod tree;

pub use linear::LinearModel;
pub use tree::{Forest, Node, NodeId, Tree, TreeValidationError};

use crate::error::CapabilityError;

/// Structural view a model may expose to attribution backends.
#[derive(Debug, Clone, Copy)]
pub enum ModelStructure<'a> {
    /// Only `predict` is available.
    Opaque,
    /// Additive linear model.
    Linear(&'a LinearModel),
    /// Decision tree ensemble.
    Forest(&'a Forest),
}

impl ModelStructure<'_> {
    /// Short name of the model family, used in error messages and logs.
    pub fn family(&self) -> &'static str {
        match self {
            Self::Opaque => "opaque",
            Self::Linear(_) => "linear",
            Self::Forest(_) => "tree",
        }
    }
}

/// A deterministic prediction capability.
///
/// Implementations must be pure: the same row always yields the same output.
pub trait Predictor: Send + Sync {
    /// Number of input features the model expects.
    fn n_features(&self) -> usize;

    /// Number of outputs per row. Default: 1.
    fn n_outputs(&self) -> usize {
        1
    }

    /// Predict a single row into `out` (length [`n_outputs`](Self::n_outputs)).
    fn predict_row_into(&self, row: &[f64], out: &mut [f64]);

    /// Structure exposed for structure-aware backends. Default: opaque.
    fn structure(&self) -> ModelStructure<'_> {
        ModelStructure::Opaque
    }
}

/// Check that a model can be used for attribution at all.
pub(crate) fn check_usable(model: &dyn Predictor) -> Result<(), CapabilityError> {
    if model.n_features() == 0 {
        return Err(CapabilityError::ModelUnusable("model has no input features"));
    }
    if model.n_outputs() == 0 {
        return Err(CapabilityError::ModelUnusable("model has no outputs"));
    }
    Ok(())
}

// =============================================================================
// FnModel
// =============================================================================

/// Wraps a closure as a single-output [`Predictor`].
///
/// # Example
///
/// ```
/// use greedyshap::model::{FnModel, Predictor};
///
/// let model = FnModel::new(2, |x: &[f64]| 3.0 * x[0] + x[1]);
/// let mut out = [0.0];
/// model.predict_row_into(&[5.0, 2.0], &mut out);
/// assert_eq!(out[0], 17.0);
/// ```
pub struct FnModel<F> {
    n_features: usize,
    f: F,
}

impl<F> FnModel<F>
where
    F: Fn(&[f64]) -> f64 + Send + Sync,
{
    pub fn new(n_features: usize, f: F) -> Self {
        Self { n_features, f }
    }
}

impl<F> Predictor for FnModel<F>
where
    F: Fn(&[f64]) -> f64 + Send + Sync,
{
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_row_into(&self, row: &[f64], out: &mut [f64]) {
        out[0] = (self.f)(row);
    }
}

impl<P: Predictor + ?Sized> Predictor for &P {
    fn n_features(&self) -> usize {
        (**self).n_features()
    }

    fn n_outputs(&self) -> usize {
        (**self).n_outputs()
    }

    fn predict_row_into(&self, row: &[f64], out: &mut [f64]) {
        (**self).predict_row_into(row, out)
    }

    fn structure(&self) -> ModelStructure<'_> {
        (**self).structure()
    }
}

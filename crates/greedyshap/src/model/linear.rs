//! Linear model capability.

use ndarray::{Array2, ArrayView1, ArrayView2, s};

use super::{ModelStructure, Predictor};

/// Linear model (weights + bias).
///
/// Weights are stored as an `Array2<f64>` with shape `[n_features + 1, n_outputs]`:
///
/// ```text
/// weights[[feature, output]] → coefficient
/// weights[[n_features, output]] → bias (last row)
/// ```
///
/// # Example
///
/// ```
/// use greedyshap::model::LinearModel;
/// use ndarray::array;
///
/// // y = 3*x0 + 1*x1
/// let model = LinearModel::from_array(array![[3.0], [1.0], [0.0]]);
/// assert_eq!(model.n_features(), 2);
/// assert_eq!(model.weight(0, 0), 3.0);
/// assert_eq!(model.bias(0), 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct LinearModel {
    /// Weight matrix: shape `[n_features + 1, n_outputs]`, last row is the bias.
    weights: Array2<f64>,
}

impl LinearModel {
    /// Create a linear model from an ndarray.
    ///
    /// # Panics
    ///
    /// Panics if the array has no rows (the bias row is required).
    pub fn from_array(weights: Array2<f64>) -> Self {
        assert!(weights.nrows() >= 1, "weights must have at least 1 row (bias)");
        Self { weights }
    }

    /// Single-output model from coefficients and a bias.
    pub fn from_coefficients(coefficients: &[f64], bias: f64) -> Self {
        let mut weights = Array2::zeros((coefficients.len() + 1, 1));
        for (feature, &w) in coefficients.iter().enumerate() {
            weights[[feature, 0]] = w;
        }
        weights[[coefficients.len(), 0]] = bias;
        Self { weights }
    }

    /// Number of input features.
    #[inline]
    pub fn n_features(&self) -> usize {
        self.weights.nrows() - 1
    }

    /// Number of outputs.
    #[inline]
    pub fn n_outputs(&self) -> usize {
        self.weights.ncols()
    }

    /// Coefficient of `feature` for `output`.
    #[inline]
    pub fn weight(&self, feature: usize, output: usize) -> f64 {
        self.weights[[feature, output]]
    }

    /// Bias of `output`.
    #[inline]
    pub fn bias(&self, output: usize) -> f64 {
        self.weights[[self.n_features(), output]]
    }

    /// All biases, one per output.
    #[inline]
    pub fn biases(&self) -> ArrayView1<'_, f64> {
        self.weights.row(self.n_features())
    }

    /// Weight matrix without the bias row, shape `[n_features, n_outputs]`.
    #[inline]
    pub fn weight_matrix(&self) -> ArrayView2<'_, f64> {
        self.weights.slice(s![..self.n_features(), ..])
    }
}

impl Predictor for LinearModel {
    fn n_features(&self) -> usize {
        LinearModel::n_features(self)
    }

    fn n_outputs(&self) -> usize {
        LinearModel::n_outputs(self)
    }

    fn predict_row_into(&self, row: &[f64], out: &mut [f64]) {
        let weights = self.weight_matrix();
        for (output, value) in out.iter_mut().enumerate() {
            let column = weights.column(output);
            *value = self.bias(output)
                + row.iter().zip(column.iter()).map(|(&x, &w)| x * w).sum::<f64>();
        }
    }

    fn structure(&self) -> ModelStructure<'_> {
        ModelStructure::Linear(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn linear_model_from_array() {
        let model = LinearModel::from_array(array![[0.5], [0.3], [0.1]]);

        assert_eq!(model.n_features(), 2);
        assert_eq!(LinearModel::n_outputs(&model), 1);
        assert_eq!(model.weight(0, 0), 0.5);
        assert_eq!(model.weight(1, 0), 0.3);
        assert_eq!(model.bias(0), 0.1);
    }

    #[test]
    fn linear_model_from_coefficients() {
        let model = LinearModel::from_coefficients(&[3.0, 1.0], 0.5);
        assert_eq!(model.n_features(), 2);
        assert_eq!(model.weight(0, 0), 3.0);
        assert_eq!(model.bias(0), 0.5);
    }

    #[test]
    fn linear_model_multioutput_predict() {
        let model = LinearModel::from_array(array![
            [0.1, 0.2], // feature 0
            [0.3, 0.4], // feature 1
            [0.5, 0.6], // bias
        ]);
        let mut out = [0.0; 2];
        model.predict_row_into(&[1.0, 2.0], &mut out);

        assert!((out[0] - (0.1 + 0.6 + 0.5)).abs() < 1e-12);
        assert!((out[1] - (0.2 + 0.8 + 0.6)).abs() < 1e-12);
        assert_eq!(model.biases().len(), 2);
    }

    #[test]
    fn linear_model_exposes_structure() {
        let model = LinearModel::from_coefficients(&[1.0], 0.0);
        assert!(matches!(model.structure(), ModelStructure::Linear(_)));
    }

    #[test]
    #[should_panic(expected = "at least 1 row")]
    fn linear_model_requires_bias_row() {
        LinearModel::from_array(Array2::zeros((0, 1)));
    }
}

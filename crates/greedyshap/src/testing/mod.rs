//! Test helpers shared by unit tests, integration tests and benchmarks.
//!
//! Seeded synthetic data generators and small conveniences for checking
//! attribution axioms.

use ndarray::{Array2, ArrayView2};
use rand::prelude::*;

use crate::model::Predictor;

/// Default absolute tolerance for attribution comparisons.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// Assert two attribution slices agree element-wise within a tolerance.
///
/// Panics with the first offending index, both values and the difference.
///
/// ```
/// use greedyshap::assert_attributions_eq;
///
/// assert_attributions_eq!(&[1.0, 2.0], &[1.0, 2.0 + 1e-12], 1e-9);
/// ```
#[macro_export]
macro_rules! assert_attributions_eq {
    ($left:expr, $right:expr, $tolerance:expr) => {
        $crate::assert_attributions_eq!($left, $right, $tolerance, "attributions differ")
    };
    ($left:expr, $right:expr, $tolerance:expr, $($arg:tt)+) => {{
        let left_val = $left;
        let right_val = $right;
        let left: &[f64] = &left_val[..];
        let right: &[f64] = &right_val[..];
        let tol: f64 = $tolerance;
        assert_eq!(left.len(), right.len(), "{}: length mismatch", format_args!($($arg)+));
        for (i, (a, b)) in left.iter().zip(right.iter()).enumerate() {
            let diff = (a - b).abs();
            if !(diff <= tol) {
                panic!(
                    "{} at [{}]\n  left: `{:?}`\n right: `{:?}`\n  diff: `{:?}` > tolerance `{:?}`",
                    format_args!($($arg)+), i, a, b, diff, tol
                );
            }
        }
    }};
}

/// Random dense matrix with values uniform in `[min, max]`.
pub fn random_dense(rows: usize, cols: usize, seed: u64, min: f64, max: f64) -> Array2<f64> {
    assert!(max >= min);
    let mut rng = StdRng::seed_from_u64(seed);
    let width = max - min;
    Array2::from_shape_simple_fn((rows, cols), || min + rng.r#gen::<f64>() * width)
}

/// Append `copies` exact copies of `column` as new trailing columns.
pub fn with_duplicates(data: ArrayView2<'_, f64>, column: usize, copies: usize) -> Array2<f64> {
    let (rows, cols) = data.dim();
    Array2::from_shape_fn((rows, cols + copies), |(r, c)| {
        if c < cols { data[[r, c]] } else { data[[r, column]] }
    })
}

/// Append one copy of `column` perturbed by uniform noise in `[-noise, noise]`.
pub fn with_noisy_copy(data: ArrayView2<'_, f64>, column: usize, noise: f64, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let (rows, cols) = data.dim();
    let jitter: Vec<f64> = (0..rows).map(|_| (rng.r#gen::<f64>() * 2.0 - 1.0) * noise).collect();
    Array2::from_shape_fn((rows, cols + 1), |(r, c)| {
        if c < cols { data[[r, c]] } else { data[[r, column]] + jitter[r] }
    })
}

/// Model output `output` for every row of `data`.
pub fn predict_rows(model: &dyn Predictor, data: ArrayView2<'_, f64>, output: usize) -> Vec<f64> {
    let mut out = vec![0.0; model.n_outputs()];
    data.rows()
        .into_iter()
        .map(|row| {
            let row = row.to_vec();
            model.predict_row_into(&row, &mut out);
            out[output]
        })
        .collect()
}

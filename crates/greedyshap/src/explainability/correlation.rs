//! Correlation gating for auto-conditioning.
//!
//! After a winner is selected, every other free player whose association
//! with it is strictly above the threshold is conditioned alongside it.
//! Associations are computed once per run into an [`AssociationMatrix`]
//! over input columns; a group player's association with another player is
//! the largest absolute association over their member input pairs.
//!
//! A zero-variance column has undefined correlation. It is treated as
//! uncorrelated with everything and reported as degenerate.

use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::players::{PlayerId, PlayerSet};
use crate::utils::Parallelism;

/// Pairwise association statistic between two data columns.
pub trait Association: Send + Sync {
    /// Association in `[-1, 1]`, or `None` when undefined for these columns.
    fn association(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> Option<f64>;
}

/// Pearson product-moment correlation.
///
/// Undefined for fewer than two rows and for columns that are constant up
/// to rounding: all values equal, or a centred sum of squares below
/// `f64::EPSILON` times the raw sum of squares.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pearson;

/// True when `column` carries no variance beyond rounding error.
fn is_constant(column: ArrayView1<'_, f64>, centred_sq: f64) -> bool {
    let mut values = column.iter();
    let Some(&first) = values.next() else {
        return true;
    };
    if values.all(|&v| v == first) {
        return true;
    }
    let raw_sq: f64 = column.iter().map(|&v| v * v).sum();
    centred_sq <= f64::EPSILON * raw_sq
}

impl Association for Pearson {
    fn association(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> Option<f64> {
        let n = a.len();
        if n < 2 || b.len() != n {
            return None;
        }
        let mean_a = a.sum() / n as f64;
        let mean_b = b.sum() / n as f64;
        let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
        for (&x, &y) in a.iter().zip(b.iter()) {
            let (dx, dy) = (x - mean_a, y - mean_b);
            cov += dx * dy;
            var_a += dx * dx;
            var_b += dy * dy;
        }
        if is_constant(a, var_a) || is_constant(b, var_b) {
            return None;
        }
        let r = cov / (var_a.sqrt() * var_b.sqrt());
        r.is_finite().then(|| r.clamp(-1.0, 1.0))
    }
}

/// Associations between every pair of input columns.
#[derive(Debug, Clone)]
pub struct AssociationMatrix {
    /// `NaN` where the association is undefined.
    values: Array2<f64>,
    /// Columns whose association with themselves is undefined.
    degenerate: Vec<bool>,
}

impl AssociationMatrix {
    /// Compute all pairwise associations over the columns of `data`.
    pub fn compute(data: ArrayView2<'_, f64>, measure: &dyn Association, parallelism: Parallelism) -> Self {
        let n = data.ncols();
        let rows = parallelism.maybe_par_map(0..n, |i| {
            (0..n)
                .map(|j| {
                    measure
                        .association(data.column(i), data.column(j))
                        .unwrap_or(f64::NAN)
                })
                .collect::<Vec<_>>()
        });

        let mut values = Array2::from_elem((n, n), f64::NAN);
        for (i, row) in rows.into_iter().enumerate() {
            for (j, v) in row.into_iter().enumerate() {
                values[[i, j]] = v;
            }
        }
        let degenerate = (0..n).map(|i| values[[i, i]].is_nan()).collect();
        Self { values, degenerate }
    }

    #[inline]
    pub fn n_inputs(&self) -> usize {
        self.degenerate.len()
    }

    /// Association between two inputs, `None` if undefined.
    #[inline]
    pub fn get(&self, a: usize, b: usize) -> Option<f64> {
        let v = self.values[[a, b]];
        (!v.is_nan()).then_some(v)
    }

    /// Inputs with undefined self-association: zero variance, or too few
    /// rows for Pearson.
    pub fn degenerate_inputs(&self) -> Vec<usize> {
        (0..self.n_inputs()).filter(|&i| self.degenerate[i]).collect()
    }
}

/// Players gated alongside a winner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Correlates {
    /// Free players strictly above the threshold, ascending.
    pub conditioned: Vec<PlayerId>,
    /// Free players whose association with the winner is undefined for at
    /// least one member pair.
    pub degenerate: Vec<PlayerId>,
}

/// Strict `|association| > threshold` gate over a player set.
#[derive(Debug, Clone)]
pub struct CorrelationGate {
    matrix: AssociationMatrix,
    threshold: f64,
}

impl CorrelationGate {
    pub fn new(matrix: AssociationMatrix, threshold: f64) -> Self {
        Self { matrix, threshold }
    }

    /// Largest `|association|` over member input pairs of two players.
    ///
    /// Undefined pairs count as zero. The second value reports whether any
    /// pair was undefined.
    pub fn player_association(&self, players: &PlayerSet, a: PlayerId, b: PlayerId) -> (f64, bool) {
        let mut max = 0.0f64;
        let mut undefined = false;
        for &i in players.player(a).inputs() {
            for &j in players.player(b).inputs() {
                match self.matrix.get(i, j) {
                    Some(r) => max = max.max(r.abs()),
                    None => undefined = true,
                }
            }
        }
        (max, undefined)
    }

    /// Free players (other than `winner`) gated alongside it.
    pub fn correlates(&self, players: &PlayerSet, winner: PlayerId, free: &[PlayerId]) -> Correlates {
        let mut out = Correlates::default();
        for &p in free.iter().filter(|&&p| p != winner) {
            let (assoc, undefined) = self.player_association(players, winner, p);
            if undefined {
                out.degenerate.push(p);
            }
            if assoc > self.threshold {
                out.conditioned.push(p);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::players::{GroupPartition, default_feature_names};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn data() -> Array2<f64> {
        // col0, col1 = 2*col0 + 1, col2 = -col0, col3 constant, col4 noise
        array![
            [1.0, 3.0, -1.0, 5.0, 0.3],
            [2.0, 5.0, -2.0, 5.0, -1.0],
            [3.0, 7.0, -3.0, 5.0, 0.8],
            [4.0, 9.0, -4.0, 5.0, 0.1],
        ]
    }

    #[test]
    fn pearson_values() {
        let d = data();
        let p = Pearson;
        assert_abs_diff_eq!(p.association(d.column(0), d.column(1)).unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.association(d.column(0), d.column(2)).unwrap(), -1.0, epsilon = 1e-12);
        assert_eq!(p.association(d.column(0), d.column(3)), None);
        let r = p.association(d.column(0), d.column(4)).unwrap();
        assert!(r.abs() < 0.8);
    }

    #[test]
    fn pearson_rejects_unrepresentable_constant() {
        // 0.1 has no exact binary form, so the rounded mean leaves tiny residuals.
        let constant = array![0.1, 0.1, 0.1];
        let other = array![0.7, 0.7, 0.7];
        let varying = array![1.0, 2.0, 4.0];
        let p = Pearson;
        assert_eq!(p.association(constant.view(), constant.view()), None);
        assert_eq!(p.association(constant.view(), other.view()), None);
        assert_eq!(p.association(varying.view(), constant.view()), None);
        assert!(p.association(varying.view(), varying.view()).is_some());
    }

    #[test]
    fn pearson_rejects_rounding_noise_around_constant() {
        let jittered = array![0.3, 0.1 + 0.2, 0.3];
        assert_ne!(jittered[0], jittered[1]);
        assert_eq!(Pearson.association(jittered.view(), array![1.0, 2.0, 3.0].view()), None);
    }

    #[test]
    fn single_row_is_degenerate_everywhere() {
        let m = AssociationMatrix::compute(array![[1.0, 2.0]].view(), &Pearson, Parallelism::Sequential);
        assert_eq!(m.degenerate_inputs(), vec![0, 1]);
    }

    #[test]
    fn matrix_flags_zero_variance() {
        let m = AssociationMatrix::compute(data().view(), &Pearson, Parallelism::Sequential);
        assert_eq!(m.degenerate_inputs(), vec![3]);
        assert_eq!(m.get(3, 0), None);
        assert_abs_diff_eq!(m.get(1, 0).unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn gate_is_strict_and_records_degenerate() {
        let m = AssociationMatrix::compute(data().view(), &Pearson, Parallelism::Sequential);
        let players = PlayerSet::features(&default_feature_names(5));
        let gate = CorrelationGate::new(m.clone(), 0.8);

        let c = gate.correlates(&players, 0, &[0, 1, 2, 3, 4]);
        assert_eq!(c.conditioned, vec![1, 2]);
        assert_eq!(c.degenerate, vec![3]);

        // |r| = 1 is never strictly above 1
        let c = CorrelationGate::new(m, 1.0).correlates(&players, 0, &[1, 2, 4]);
        assert!(c.conditioned.is_empty());
    }

    #[test]
    fn group_association_is_max_over_members() {
        let m = AssociationMatrix::compute(data().view(), &Pearson, Parallelism::Parallel);
        let players = PlayerSet::grouped(
            &default_feature_names(5),
            &GroupPartition::new().with_group("g", [2, 4]),
        )
        .unwrap();
        // players: g = {2, 4}, F0, F1, F3
        let gate = CorrelationGate::new(m, 0.8);
        let (assoc, undefined) = gate.player_association(&players, 1, 0);
        assert_abs_diff_eq!(assoc, 1.0, epsilon = 1e-12);
        assert!(!undefined);
        assert_eq!(gate.correlates(&players, 1, &[0, 2, 3]).conditioned, vec![0, 2]);
    }
}

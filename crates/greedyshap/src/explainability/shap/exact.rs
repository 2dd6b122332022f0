//! Exact Shapley values by coalition enumeration.
//!
//! For a player set `N` with `|N| = n`:
//!
//! ```text
//! phi_i = sum over S ⊆ N \ {i} of w(|S|) * (v(S ∪ {i}) - v(S))
//! w(s)  = s! (n - s - 1)! / n!  =  1 / (n * C(n - 1, s))
//! ```
//!
//! The weights are computed from exact integer binomials, and every coalition
//! value is evaluated once into a `2^n` table indexed by coalition bits.

use super::coalition::CoalitionValue;
use crate::error::{CapabilityError, ExplainError};
use crate::players::{Coalition, MAX_EXACT_PLAYERS, PlayerSet};
use crate::utils::Parallelism;

/// Binomial coefficient `C(n, k)` in exact integer arithmetic.
///
/// Exact for every `n` up to the 32-player coalition width.
pub fn binomial(n: u64, k: u64) -> u64 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    // Each partial product C(n - k + i, i) is an integer.
    (1..=k).fold(1u64, |acc, i| acc * (n - k + i) / i)
}

/// Shapley weight `w(s)` for every coalition size `s` in `0..n`.
///
/// For each player the weights of all `2^(n-1)` coalitions without it sum
/// to one: `sum_s C(n-1, s) * w(s) = 1`.
pub fn shapley_weights(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    let m = (n - 1) as u64;
    (0..n as u64)
        .map(|s| 1.0 / (n as f64 * binomial(m, s) as f64))
        .collect()
}

/// Reject player counts beyond the exact enumeration bound.
pub fn check_player_count(n_players: usize) -> Result<(), CapabilityError> {
    if n_players > MAX_EXACT_PLAYERS {
        return Err(CapabilityError::TooManyPlayers {
            n_players,
            max: MAX_EXACT_PLAYERS,
        });
    }
    Ok(())
}

/// Shapley values from a complete coalition value table.
///
/// `table[bits]` must hold `v(S)` for the coalition with those bits, for
/// all `2^n` coalitions.
pub fn shapley_from_table(n: usize, table: &[f64], parallelism: Parallelism) -> Vec<f64> {
    debug_assert_eq!(table.len(), 1usize << n);
    match n {
        0 => return Vec::new(),
        1 => return vec![table[1] - table[0]],
        _ => {}
    }
    let weights = shapley_weights(n);
    parallelism.maybe_par_map(0..n, |player| {
        let bit = 1usize << player;
        let mut phi = 0.0;
        for bits in 0..table.len() {
            if bits & bit != 0 {
                continue;
            }
            let size = bits.count_ones() as usize;
            phi += weights[size] * (table[bits | bit] - table[bits]);
        }
        phi
    })
}

/// Shapley values of one instance over one player set.
///
/// A fresh result is produced for every computation; it is never updated in
/// place.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapleyResult {
    values: Vec<f64>,
    base_value: f64,
    full_value: f64,
}

impl ShapleyResult {
    /// Attribution of every player, in player order.
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[inline]
    pub fn get(&self, player: usize) -> f64 {
        self.values[player]
    }

    /// `v(∅)`: the expected output under the background.
    #[inline]
    pub fn base_value(&self) -> f64 {
        self.base_value
    }

    /// `v(N)`: the output with every player present.
    #[inline]
    pub fn full_value(&self) -> f64 {
        self.full_value
    }

    /// Sum of all attributions.
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// `|sum(phi) - (v(N) - v(∅))|`, zero up to rounding.
    pub fn efficiency_gap(&self) -> f64 {
        (self.sum() - (self.full_value - self.base_value)).abs()
    }

    /// Attributions keyed by player name.
    pub fn named(&self, players: &PlayerSet) -> Vec<(String, f64)> {
        debug_assert_eq!(players.len(), self.values.len());
        players
            .iter()
            .zip(&self.values)
            .map(|(p, &v)| (p.name().to_string(), v))
            .collect()
    }
}

/// Exact Shapley computer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactShapley {
    parallelism: Parallelism,
}

impl ExactShapley {
    pub fn new(parallelism: Parallelism) -> Self {
        Self { parallelism }
    }

    /// Shapley values of an arbitrary `n`-player game.
    ///
    /// `value` is called once per coalition, possibly from several threads.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::TooManyPlayers`] for `n > MAX_EXACT_PLAYERS`,
    /// or the first error produced by `value`.
    pub fn compute<F>(&self, n_players: usize, value: F) -> Result<ShapleyResult, ExplainError>
    where
        F: Fn(Coalition) -> Result<f64, ExplainError> + Sync + Send,
    {
        check_player_count(n_players)?;
        let table = self
            .parallelism
            .maybe_par_map(0..1usize << n_players, |bits| value(Coalition::from_bits(bits as u32)))
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.finish(n_players, table))
    }

    /// Shapley values of `instance` under a coalition value function.
    pub fn explain(&self, value: &CoalitionValue<'_>, instance: &[f64]) -> Result<ShapleyResult, ExplainError> {
        let n_players = value.players().len();
        check_player_count(n_players)?;
        let table = value.table(instance, self.parallelism)?;
        Ok(self.finish(n_players, table))
    }

    fn finish(&self, n_players: usize, table: Vec<f64>) -> ShapleyResult {
        let values = shapley_from_table(n_players, &table, self.parallelism);
        ShapleyResult {
            values,
            base_value: table[0],
            full_value: table[table.len() - 1],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LinearModel;
    use crate::players::default_feature_names;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rstest::rstest;

    #[test]
    fn binomial_values() {
        assert_eq!(binomial(0, 0), 1);
        assert_eq!(binomial(5, 2), 10);
        assert_eq!(binomial(19, 9), 92_378);
        assert_eq!(binomial(3, 4), 0);
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(5)]
    #[case(MAX_EXACT_PLAYERS)]
    fn weights_are_normalised(#[case] n: usize) {
        let weights = shapley_weights(n);
        let total: f64 = (0..n)
            .map(|s| binomial((n - 1) as u64, s as u64) as f64 * weights[s])
            .sum();
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn weights_match_factorial_formula() {
        // n = 3: w(0) = 2!/3! = 1/3, w(1) = 1!1!/3! = 1/6, w(2) = 2!/3! = 1/3
        let w = shapley_weights(3);
        assert_abs_diff_eq!(w[0], 1.0 / 3.0, epsilon = 1e-15);
        assert_abs_diff_eq!(w[1], 1.0 / 6.0, epsilon = 1e-15);
        assert_abs_diff_eq!(w[2], 1.0 / 3.0, epsilon = 1e-15);
    }

    #[test]
    fn zero_players_is_empty() {
        let result = ExactShapley::default().compute(0, |_| Ok(4.0)).unwrap();
        assert!(result.values().is_empty());
        assert_eq!(result.base_value(), 4.0);
    }

    #[test]
    fn single_player_is_difference() {
        let result = ExactShapley::default()
            .compute(1, |c| Ok(if c.contains(0) { 7.5 } else { 2.0 }))
            .unwrap();
        assert_eq!(result.values(), &[5.5]);
    }

    #[test]
    fn glove_game() {
        // Players 0 and 1 hold left gloves, player 2 a right glove.
        let v = |c: Coalition| -> Result<f64, ExplainError> {
            let left = c.contains(0) || c.contains(1);
            Ok(if left && c.contains(2) { 1.0 } else { 0.0 })
        };
        let result = ExactShapley::new(Parallelism::Sequential).compute(3, v).unwrap();
        assert_abs_diff_eq!(result.get(0), 1.0 / 6.0, epsilon = 1e-12);
        assert_abs_diff_eq!(result.get(1), 1.0 / 6.0, epsilon = 1e-12);
        assert_abs_diff_eq!(result.get(2), 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn too_many_players() {
        let err = ExactShapley::default()
            .compute(MAX_EXACT_PLAYERS + 1, |_| Ok(0.0))
            .unwrap_err();
        assert_eq!(
            err,
            ExplainError::Capability(CapabilityError::TooManyPlayers {
                n_players: MAX_EXACT_PLAYERS + 1,
                max: MAX_EXACT_PLAYERS
            })
        );
    }

    #[test]
    fn value_errors_propagate() {
        let err = ExactShapley::default()
            .compute(2, |c| {
                if c.len() == 2 {
                    Err(ExplainError::UnknownPlayer { player: 9, n_players: 2 })
                } else {
                    Ok(0.0)
                }
            })
            .unwrap_err();
        assert!(matches!(err, ExplainError::UnknownPlayer { player: 9, .. }));
    }

    #[test]
    fn explain_linear_model() {
        let model = LinearModel::from_coefficients(&[3.0, 1.0], 0.0);
        let background = array![[0.0, 0.0]];
        let players = PlayerSet::features(&default_feature_names(2));
        let value = CoalitionValue::new(&model, background.view(), &players).unwrap();

        let result = ExactShapley::default().explain(&value, &[5.0, 2.0]).unwrap();
        assert_abs_diff_eq!(result.get(0), 15.0, epsilon = 1e-12);
        assert_abs_diff_eq!(result.get(1), 2.0, epsilon = 1e-12);
        assert!(result.efficiency_gap() < 1e-12);
        assert_eq!(result.named(&players)[0].0, "F0");
    }
}

//! Coalition value function.
//!
//! `value(S, x)` is the model's expected output when the players in `S`
//! (and every conditioned input) take the instance's values and all other
//! inputs take background values, averaged over the background rows.

use ndarray::ArrayView2;

use super::conditioning::{ConditioningState, UNCONDITIONED};
use crate::error::{CapabilityError, ConfigError, ExplainError};
use crate::model::Predictor;
use crate::players::{Coalition, MAX_EXACT_PLAYERS, PlayerId, PlayerSet};
use crate::utils::Parallelism;

/// Interventional coalition value function over a [`PlayerSet`].
///
/// Pure: evaluating a coalition has no side effects and depends only on the
/// model, the background, the player set, the conditioning snapshot and the
/// instance.
#[derive(Clone, Copy)]
pub struct CoalitionValue<'a> {
    model: &'a dyn Predictor,
    background: ArrayView2<'a, f64>,
    players: &'a PlayerSet,
    conditioning: &'a ConditioningState,
    output: usize,
}

impl<'a> CoalitionValue<'a> {
    /// Create a value function explaining output 0 with nothing conditioned.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the background is empty or its width, or
    /// the player set's width, differs from the model's input dimensionality.
    pub fn new(
        model: &'a dyn Predictor,
        background: ArrayView2<'a, f64>,
        players: &'a PlayerSet,
    ) -> Result<Self, ConfigError> {
        let n_features = model.n_features();
        if background.nrows() == 0 {
            return Err(ConfigError::EmptyData("background"));
        }
        if background.ncols() != n_features {
            return Err(ConfigError::DimensionMismatch {
                what: "background",
                expected: n_features,
                actual: background.ncols(),
            });
        }
        if players.n_inputs() != n_features {
            return Err(ConfigError::DimensionMismatch {
                what: "player set",
                expected: n_features,
                actual: players.n_inputs(),
            });
        }
        Ok(Self {
            model,
            background,
            players,
            conditioning: &UNCONDITIONED,
            output: 0,
        })
    }

    /// Apply a conditioning snapshot.
    pub fn with_conditioning(mut self, conditioning: &'a ConditioningState) -> Self {
        self.conditioning = conditioning;
        self
    }

    /// Select which model output is explained.
    pub fn with_output(mut self, output: usize) -> Result<Self, ConfigError> {
        let n_outputs = self.model.n_outputs();
        if output >= n_outputs {
            return Err(ConfigError::OutputOutOfRange { output, n_outputs });
        }
        self.output = output;
        Ok(self)
    }

    #[inline]
    pub fn players(&self) -> &'a PlayerSet {
        self.players
    }

    fn check_instance(&self, instance: &[f64]) -> Result<(), ConfigError> {
        let expected = self.model.n_features();
        if instance.len() != expected {
            return Err(ConfigError::DimensionMismatch {
                what: "instance",
                expected,
                actual: instance.len(),
            });
        }
        Ok(())
    }

    /// Value of `coalition` for `instance`.
    ///
    /// # Errors
    ///
    /// Fails if the coalition names a player outside the active set or the
    /// instance width does not match the model.
    pub fn evaluate(&self, instance: &[f64], coalition: Coalition) -> Result<f64, ExplainError> {
        self.check_instance(instance)?;
        let n_players = self.players.len();
        if coalition.span() > n_players {
            return Err(ExplainError::UnknownPlayer {
                player: coalition.span() - 1,
                n_players,
            });
        }
        Ok(self.evaluate_players(instance, coalition.iter()))
    }

    /// Value of the coalition made of `members`. Callers guarantee the
    /// instance width and that every member exists.
    fn evaluate_players(&self, instance: &[f64], members: impl Iterator<Item = PlayerId>) -> f64 {
        let n_inputs = self.players.n_inputs();
        let mut present = vec![false; n_inputs];
        for &input in self.conditioning.fixed_inputs() {
            present[input] = true;
        }
        for player in members {
            for &input in self.players.player(player).inputs() {
                present[input] = true;
            }
        }

        let mut row = vec![0.0; n_inputs];
        let mut out = vec![0.0; self.model.n_outputs()];
        let mut total = 0.0;
        for background_row in self.background.rows() {
            for (j, (slot, &b)) in row.iter_mut().zip(background_row.iter()).enumerate() {
                *slot = if present[j] { instance[j] } else { b };
            }
            self.model.predict_row_into(&row, &mut out);
            total += out[self.output];
        }
        total / self.background.nrows() as f64
    }

    /// Values of all `2^n` coalitions, indexed by coalition bits.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::TooManyPlayers`] beyond [`MAX_EXACT_PLAYERS`].
    pub fn table(&self, instance: &[f64], parallelism: Parallelism) -> Result<Vec<f64>, ExplainError> {
        let all: Vec<PlayerId> = (0..self.players.len()).collect();
        self.restricted_table(instance, &all, parallelism)
    }

    /// Values of every coalition of the sub-game over `active` players.
    ///
    /// Bit `k` of a coalition index stands for player `active[k]`; players
    /// outside `active` are absent from every coalition.
    ///
    /// # Errors
    ///
    /// Fails if `active` names an unknown player or holds more than
    /// [`MAX_EXACT_PLAYERS`] players.
    pub fn restricted_table(
        &self,
        instance: &[f64],
        active: &[PlayerId],
        parallelism: Parallelism,
    ) -> Result<Vec<f64>, ExplainError> {
        self.check_instance(instance)?;
        if active.len() > MAX_EXACT_PLAYERS {
            return Err(CapabilityError::TooManyPlayers {
                n_players: active.len(),
                max: MAX_EXACT_PLAYERS,
            }
            .into());
        }
        let n_players = self.players.len();
        if let Some(&player) = active.iter().find(|&&p| p >= n_players) {
            return Err(ExplainError::UnknownPlayer { player, n_players });
        }
        let n_coalitions = 1usize << active.len();
        Ok(parallelism.maybe_par_map(0..n_coalitions, |bits| {
            let coalition = Coalition::from_bits(bits as u32);
            self.evaluate_players(instance, coalition.iter().map(|k| active[k]))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FnModel, LinearModel};
    use crate::players::{GroupPartition, default_feature_names};
    use ndarray::array;

    #[test]
    fn empty_and_full_coalitions() {
        let model = LinearModel::from_coefficients(&[3.0, 1.0], 0.0);
        let background = array![[0.0, 0.0], [2.0, 4.0]];
        let players = PlayerSet::features(&default_feature_names(2));
        let value = CoalitionValue::new(&model, background.view(), &players).unwrap();

        let x = [5.0, 2.0];
        // Background mean prediction: (0 + 10) / 2
        assert_eq!(value.evaluate(&x, Coalition::EMPTY).unwrap(), 5.0);
        assert_eq!(value.evaluate(&x, Coalition::full(2)).unwrap(), 17.0);
        // Only x0 present: 15 + mean(x1 background) = 15 + 2
        assert_eq!(value.evaluate(&x, Coalition::EMPTY.with(0)).unwrap(), 17.0);
    }

    #[test]
    fn group_player_substitutes_all_members() {
        let model = FnModel::new(3, |x: &[f64]| x[0] * x[2] + x[1]);
        let background = array![[0.0, 0.0, 0.0]];
        let players = PlayerSet::grouped(
            &default_feature_names(3),
            &GroupPartition::new().with_group("g", [0, 2]),
        )
        .unwrap();
        let value = CoalitionValue::new(&model, background.view(), &players).unwrap();

        let x = [2.0, 1.0, 3.0];
        assert_eq!(value.evaluate(&x, Coalition::EMPTY.with(0)).unwrap(), 6.0);
        assert_eq!(value.evaluate(&x, Coalition::EMPTY.with(1)).unwrap(), 1.0);
    }

    #[test]
    fn conditioning_pins_inputs() {
        let model = LinearModel::from_coefficients(&[3.0, 1.0], 0.0);
        let background = array![[0.0, 0.0]];
        let players = PlayerSet::features(&default_feature_names(2));
        let state = ConditioningState::new().fix([0]);
        let value = CoalitionValue::new(&model, background.view(), &players)
            .unwrap()
            .with_conditioning(&state);

        assert_eq!(value.evaluate(&[5.0, 2.0], Coalition::EMPTY).unwrap(), 15.0);
    }

    #[test]
    fn rejects_unknown_player_and_bad_instance() {
        let model = LinearModel::from_coefficients(&[1.0, 1.0], 0.0);
        let background = array![[0.0, 0.0]];
        let players = PlayerSet::features(&default_feature_names(2));
        let value = CoalitionValue::new(&model, background.view(), &players).unwrap();

        assert_eq!(
            value.evaluate(&[1.0, 1.0], Coalition::EMPTY.with(4)),
            Err(ExplainError::UnknownPlayer { player: 4, n_players: 2 })
        );
        assert!(matches!(
            value.evaluate(&[1.0], Coalition::EMPTY),
            Err(ExplainError::Config(ConfigError::DimensionMismatch { what: "instance", .. }))
        ));
    }

    #[test]
    fn rejects_bad_background_and_output() {
        let model = LinearModel::from_coefficients(&[1.0, 1.0], 0.0);
        let players = PlayerSet::features(&default_feature_names(2));

        let empty = ndarray::Array2::<f64>::zeros((0, 2));
        assert_eq!(
            CoalitionValue::new(&model, empty.view(), &players).err(),
            Some(ConfigError::EmptyData("background"))
        );

        let background = array![[0.0, 0.0]];
        let value = CoalitionValue::new(&model, background.view(), &players).unwrap();
        assert_eq!(
            value.with_output(1).err(),
            Some(ConfigError::OutputOutOfRange { output: 1, n_outputs: 1 })
        );
    }

    #[test]
    fn table_matches_evaluate() {
        let model = FnModel::new(3, |x: &[f64]| x[0] * x[1] - x[2]);
        let background = array![[1.0, 0.0, 2.0], [0.0, 1.0, -1.0]];
        let players = PlayerSet::features(&default_feature_names(3));
        let value = CoalitionValue::new(&model, background.view(), &players).unwrap();
        let x = [2.0, 3.0, 1.0];

        let table = value.table(&x, Parallelism::Parallel).unwrap();
        assert_eq!(table.len(), 8);
        for (bits, &v) in table.iter().enumerate() {
            let expected = value.evaluate(&x, Coalition::from_bits(bits as u32)).unwrap();
            assert_eq!(v, expected);
        }
    }

    #[test]
    fn restricted_table_maps_bits_to_active_players() {
        let model = LinearModel::from_coefficients(&[1.0, 10.0, 100.0], 0.0);
        let background = array![[0.0, 0.0, 0.0]];
        let players = PlayerSet::features(&default_feature_names(3));
        let value = CoalitionValue::new(&model, background.view(), &players).unwrap();

        let table = value
            .restricted_table(&[1.0, 1.0, 1.0], &[0, 2], Parallelism::Sequential)
            .unwrap();
        assert_eq!(table, vec![0.0, 1.0, 100.0, 101.0]);

        assert_eq!(
            value.restricted_table(&[1.0, 1.0, 1.0], &[7], Parallelism::Sequential),
            Err(ExplainError::UnknownPlayer { player: 7, n_players: 3 })
        );
    }
}

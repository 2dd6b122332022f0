//! SHAP values container.
//!
//! Stores attributions for a batch of explained instances with proper
//! indexing and verification utilities.

/// Container for SHAP values.
///
/// Stores per-instance, per-player contributions for one model output.
/// Layout is `[samples × (players + 1)]` where the trailing slot of every
/// sample holds the base value (the coalition value of the empty set).
#[derive(Clone, Debug, PartialEq)]
pub struct ShapValues {
    /// Flat storage: [sample][player + base]
    values: Vec<f64>,
    /// Player names, in player order.
    players: Vec<String>,
    n_samples: usize,
}

impl ShapValues {
    /// Create a new container initialized to zeros.
    pub fn zeros(n_samples: usize, players: Vec<String>) -> Self {
        let values = vec![0.0; n_samples * (players.len() + 1)];
        Self {
            values,
            players,
            n_samples,
        }
    }

    /// Number of explained samples.
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Number of players (not including the base value).
    #[inline]
    pub fn n_players(&self) -> usize {
        self.players.len()
    }

    /// Player names, in player order.
    #[inline]
    pub fn players(&self) -> &[String] {
        &self.players
    }

    #[inline]
    fn stride(&self) -> usize {
        self.players.len() + 1
    }

    #[inline]
    fn index(&self, sample: usize, player: usize) -> usize {
        sample * self.stride() + player
    }

    /// Get the value for a sample and player.
    #[inline]
    pub fn get(&self, sample: usize, player: usize) -> f64 {
        self.values[self.index(sample, player)]
    }

    /// Set the value for a sample and player.
    #[inline]
    pub fn set(&mut self, sample: usize, player: usize, value: f64) {
        let idx = self.index(sample, player);
        self.values[idx] = value;
    }

    /// Add to the value for a sample and player.
    #[inline]
    pub fn add(&mut self, sample: usize, player: usize, delta: f64) {
        let idx = self.index(sample, player);
        self.values[idx] += delta;
    }

    /// Base value (expected output under the background) for a sample.
    #[inline]
    pub fn base_value(&self, sample: usize) -> f64 {
        self.get(sample, self.players.len())
    }

    #[inline]
    pub fn set_base_value(&mut self, sample: usize, value: f64) {
        let n = self.players.len();
        self.set(sample, n, value);
    }

    /// Player values of one sample (base value excluded).
    pub fn sample(&self, sample: usize) -> &[f64] {
        let start = sample * self.stride();
        &self.values[start..start + self.players.len()]
    }

    /// Overwrite the player values of one sample.
    pub fn set_sample(&mut self, sample: usize, values: &[f64], base_value: f64) {
        debug_assert_eq!(values.len(), self.players.len());
        let start = sample * self.stride();
        self.values[start..start + values.len()].copy_from_slice(values);
        self.set_base_value(sample, base_value);
    }

    /// Mean absolute attribution of every player across samples.
    pub fn mean_abs(&self) -> Vec<f64> {
        let mut out = vec![0.0; self.players.len()];
        if self.n_samples == 0 {
            return out;
        }
        for sample in 0..self.n_samples {
            for (acc, v) in out.iter_mut().zip(self.sample(sample)) {
                *acc += v.abs();
            }
        }
        let n = self.n_samples as f64;
        out.iter_mut().for_each(|v| *v /= n);
        out
    }

    /// Mean absolute attribution keyed by player name, in player order.
    pub fn mean_abs_by_player(&self) -> Vec<(String, f64)> {
        self.players.iter().cloned().zip(self.mean_abs()).collect()
    }

    /// Verify the efficiency property against model predictions.
    ///
    /// For each sample: `sum(values) + base_value ≈ prediction`.
    /// Returns `true` if all samples are within tolerance.
    pub fn verify(&self, predictions: &[f64], tolerance: f64) -> bool {
        if predictions.len() != self.n_samples {
            return false;
        }
        (0..self.n_samples).all(|sample| {
            let sum = self.base_value(sample) + self.sample(sample).iter().sum::<f64>();
            (sum - predictions[sample]).abs() <= tolerance
        })
    }

    /// Raw values slice.
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

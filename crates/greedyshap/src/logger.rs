//! Verbosity-gated logging for greedy selection runs.
//!
//! Events go through `tracing`; the library never installs a subscriber.

use serde::{Deserialize, Serialize};

/// Verbosity level for selection output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// No output.
    #[default]
    Silent,
    /// Degenerate-data warnings only.
    Warning,
    /// Run start, one line per step and the stop reason.
    Info,
    /// Everything above plus the full attribution table of every step.
    Debug,
}

/// Logger for one selection run.
#[derive(Debug, Clone, Copy)]
pub struct SelectionLogger {
    verbosity: Verbosity,
}

impl SelectionLogger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    #[inline]
    fn enabled(&self, level: Verbosity) -> bool {
        self.verbosity >= level
    }

    pub fn start(&self, n_players: usize, backend: &str, threshold: f64, corr_threshold: f64) {
        if self.enabled(Verbosity::Info) {
            tracing::info!(
                n_players,
                backend,
                threshold,
                corr_threshold,
                "starting greedy selection"
            );
        }
    }

    /// Inputs whose correlations are undefined and treated as zero.
    ///
    /// `n_rows` is the row count of the data the associations were computed
    /// over; below two rows no association is defined for any input.
    pub fn degenerate_inputs(&self, n_rows: usize, names: &[&str]) {
        if self.enabled(Verbosity::Warning) && !names.is_empty() {
            tracing::warn!(inputs = ?names, n_rows, "{}", degenerate_cause(n_rows));
        }
    }

    /// Mean |attribution| of every free player at a step.
    pub fn attributions(&self, step: usize, table: &[(&str, f64)]) {
        if self.enabled(Verbosity::Debug) {
            for &(player, value) in table {
                tracing::debug!(step, player, mean_abs = value, "attribution");
            }
        }
    }

    pub fn selected(&self, step: usize, player: &str, mean_abs: f64, n_correlated: usize) {
        if self.enabled(Verbosity::Info) {
            tracing::info!(
                step,
                player,
                mean_abs,
                correlated = n_correlated,
                "selected player"
            );
        }
    }

    pub fn stopped(&self, step: usize, reason: &dyn std::fmt::Display) {
        if self.enabled(Verbosity::Info) {
            tracing::info!(step, reason = %reason, "selection stopped");
        }
    }
}

fn degenerate_cause(n_rows: usize) -> &'static str {
    if n_rows < 2 {
        "fewer than 2 rows: correlation undefined for every input, treated as zero"
    } else {
        "zero-variance inputs: correlation undefined, treated as zero"
    }
}

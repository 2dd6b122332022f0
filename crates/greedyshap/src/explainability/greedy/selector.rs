//! Greedy iterative ("winner takes it all") selection.
//!
//! Each step attributes every free player, selects the one with the highest
//! mean |attribution|, conditions it together with its correlates, and
//! recomputes. Conditioning a winner removes the information it carries
//! from the remaining game, so duplicates of an already selected player
//! drop to near zero and the next distinct driver surfaces.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use super::config::{CorrelationData, GreedyConfig, Level};
use crate::error::{ConfigError, ExplainError};
use crate::explainability::backend::{AttributionBackend, AttributionRequest, select_backend};
use crate::explainability::correlation::{Association, AssociationMatrix, CorrelationGate, Pearson};
use crate::explainability::shap::ConditioningState;
use crate::logger::SelectionLogger;
use crate::model::{Predictor, check_usable};
use crate::players::{GroupPartition, PlayerId, PlayerSet, resolve_feature_names};
use crate::utils::{Parallelism, run_with_threads};

// =============================================================================
// Results
// =============================================================================

/// One selected player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// 1-based step number.
    pub step: usize,
    /// Index of the selected player in the run's player set.
    pub player: PlayerId,
    pub player_name: String,
    /// Mean |attribution| of the winner across the explained instances.
    pub mean_abs_attribution: f64,
    /// Free players conditioned together with the winner, in player order.
    pub conditioned_alongside: Vec<String>,
    /// Players conditioned in this step, the winner included.
    pub n_conditioned: usize,
    /// Free players whose correlation with the winner was undefined and
    /// treated as zero.
    pub degenerate: Vec<String>,
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StopReason {
    /// Every player has been conditioned.
    NoFreePlayers,
    /// The best free player fell below the threshold.
    BelowThreshold { max_attribution: f64 },
    /// `n_steps` players were selected.
    StepLimit,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoFreePlayers => write!(f, "no free players left"),
            Self::BelowThreshold { max_attribution } => {
                write!(f, "max mean |attribution| {max_attribution:.6} below threshold")
            }
            Self::StepLimit => write!(f, "step limit reached"),
        }
    }
}

/// Selected steps plus the stop reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionReport {
    pub steps: Vec<StepResult>,
    pub stop_reason: StopReason,
}

// =============================================================================
// Selector
// =============================================================================

/// Highest value among `free`, ties to the lowest player index.
///
/// NaN ranks below every number.
fn select_winner(free: &[PlayerId], scores: &[f64]) -> Option<(PlayerId, f64)> {
    let score = |p: PlayerId| {
        let v = scores[p];
        if v.is_nan() { f64::NEG_INFINITY } else { v }
    };
    free.iter().fold(None, |best, &p| match best {
        Some((_, best_value)) if score(p) <= best_value => best,
        _ => Some((p, score(p))),
    })
}

/// Greedy iterative selector over one configuration.
///
/// # Example
///
/// ```
/// use greedyshap::explainability::greedy::{GreedyConfig, GreedySelector};
/// use greedyshap::model::LinearModel;
/// use ndarray::array;
///
/// // y = 3*x0 + x1, with x2 a copy of x0
/// let model = LinearModel::from_coefficients(&[3.0, 1.0, 0.0], 0.0);
/// let background = array![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]];
/// let explain = array![[1.0, 0.0, 1.0], [0.0, 1.0, 0.0], [1.0, 1.0, 1.0]];
///
/// let config = GreedyConfig::builder().build().unwrap();
/// let report = GreedySelector::new(&config)
///     .run(&model, background.view(), explain.view(), None)
///     .unwrap();
/// assert_eq!(report.steps[0].player_name, "F0");
/// assert_eq!(report.steps[0].conditioned_alongside, vec!["F2".to_string()]);
/// ```
pub struct GreedySelector<'a> {
    config: &'a GreedyConfig,
    partition: Option<&'a GroupPartition>,
    association: &'a dyn Association,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> GreedySelector<'a> {
    /// Selector using Pearson correlation and no group partition.
    pub fn new(config: &'a GreedyConfig) -> Self {
        Self {
            config,
            partition: None,
            association: &Pearson,
            cancel: None,
        }
    }

    /// Group partition used when `config.level` is [`Level::Group`].
    pub fn with_partition(mut self, partition: &'a GroupPartition) -> Self {
        self.partition = Some(partition);
        self
    }

    /// Replace the association statistic used by the correlation gate.
    pub fn with_association(mut self, association: &'a dyn Association) -> Self {
        self.association = association;
        self
    }

    /// Abort with [`ExplainError::Cancelled`] once `flag` is raised.
    ///
    /// The flag is checked at the start of every step.
    pub fn with_cancellation(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Run the selection.
    ///
    /// Every configuration and capability check happens before the first
    /// attribution pass. On error no steps are returned.
    ///
    /// # Errors
    ///
    /// [`ExplainError::Config`] for invalid configuration or data,
    /// [`ExplainError::Capability`] when the model or backend cannot serve
    /// the run, [`ExplainError::Cancelled`] on external cancellation.
    pub fn run(
        &self,
        model: &dyn Predictor,
        background: ArrayView2<'_, f64>,
        explain: ArrayView2<'_, f64>,
        feature_names: Option<&[String]>,
    ) -> Result<SelectionReport, ExplainError> {
        let config = self.config;
        config.validate()?;
        check_usable(model)?;
        check_data(model, background, explain)?;
        let n_outputs = model.n_outputs();
        if config.output >= n_outputs {
            return Err(ConfigError::OutputOutOfRange {
                output: config.output,
                n_outputs,
            }
            .into());
        }

        let names = resolve_feature_names(feature_names, model.n_features())?;
        let players = match config.level {
            Level::Feature => PlayerSet::features(&names),
            Level::Group => {
                let partition = self.partition.ok_or(ConfigError::MissingGroupPartition)?;
                PlayerSet::grouped(&names, partition)?
            }
        };
        let backend = select_backend(config.backend, model)?;
        backend.check(model, &players)?;

        let run = Run {
            selector: self,
            model,
            background: background.reborrow(),
            explain: explain.reborrow(),
            players: &players,
            backend: backend.as_ref(),
        };
        run_with_threads(config.n_threads, |parallelism| run.select(parallelism))?
    }
}

fn check_data(
    model: &dyn Predictor,
    background: ArrayView2<'_, f64>,
    explain: ArrayView2<'_, f64>,
) -> Result<(), ConfigError> {
    let n_features = model.n_features();
    for (what, data) in [("background", background.reborrow()), ("explain", explain.reborrow())] {
        if data.nrows() == 0 {
            return Err(ConfigError::EmptyData(what));
        }
        if data.ncols() != n_features {
            return Err(ConfigError::DimensionMismatch {
                what,
                expected: n_features,
                actual: data.ncols(),
            });
        }
    }
    Ok(())
}

/// One validated run.
struct Run<'r> {
    selector: &'r GreedySelector<'r>,
    model: &'r dyn Predictor,
    background: ArrayView2<'r, f64>,
    explain: ArrayView2<'r, f64>,
    players: &'r PlayerSet,
    backend: &'r dyn AttributionBackend,
}

impl Run<'_> {
    fn select(&self, parallelism: Parallelism) -> Result<SelectionReport, ExplainError> {
        let config = self.selector.config;
        let players = self.players;
        let logger = SelectionLogger::new(config.verbosity);
        logger.start(players.len(), self.backend.name(), config.threshold, config.corr_threshold);

        let correlation_data = match config.correlation_data {
            CorrelationData::Explain => self.explain,
            CorrelationData::Background => self.background,
        };
        let matrix = AssociationMatrix::compute(correlation_data, self.selector.association, parallelism);
        let degenerate_inputs = matrix.degenerate_inputs();
        let degenerate_names: Vec<&str> = degenerate_inputs
            .iter()
            .map(|&input| players.name(players.owner_of(input)))
            .collect();
        logger.degenerate_inputs(correlation_data.nrows(), &degenerate_names);
        let gate = CorrelationGate::new(matrix, config.corr_threshold);

        let mut conditioning = ConditioningState::new();
        let mut free = vec![true; players.len()];
        let mut steps: Vec<StepResult> = Vec::new();

        let stop_reason = loop {
            let step = steps.len() + 1;
            if steps.len() >= config.n_steps {
                break StopReason::StepLimit;
            }
            let free_ids: Vec<PlayerId> = (0..players.len()).filter(|&p| free[p]).collect();
            if free_ids.is_empty() {
                break StopReason::NoFreePlayers;
            }
            if self.selector.cancelled() {
                return Err(ExplainError::Cancelled { step });
            }

            let shap = self.backend.attribute(&AttributionRequest {
                model: self.model,
                background: self.background.reborrow(),
                instances: self.explain.reborrow(),
                players,
                conditioning: &conditioning,
                output: config.output,
                parallelism,
            })?;
            let mean_abs = shap.mean_abs();
            let table: Vec<(&str, f64)> = free_ids.iter().map(|&p| (players.name(p), mean_abs[p])).collect();
            logger.attributions(step, &table);

            let Some((winner, max_attribution)) = select_winner(&free_ids, &mean_abs) else {
                break StopReason::NoFreePlayers;
            };
            if max_attribution < config.threshold {
                break StopReason::BelowThreshold { max_attribution };
            }

            let correlates = gate.correlates(players, winner, &free_ids);
            let newly_fixed: Vec<PlayerId> = std::iter::once(winner)
                .chain(correlates.conditioned.iter().copied())
                .collect();
            conditioning = conditioning.fix(
                newly_fixed
                    .iter()
                    .flat_map(|&p| players.player(p).inputs().iter().copied()),
            );
            for &p in &newly_fixed {
                free[p] = false;
            }

            let result = StepResult {
                step,
                player: winner,
                player_name: players.name(winner).to_string(),
                mean_abs_attribution: max_attribution,
                conditioned_alongside: correlates
                    .conditioned
                    .iter()
                    .map(|&p| players.name(p).to_string())
                    .collect(),
                n_conditioned: newly_fixed.len(),
                degenerate: correlates
                    .degenerate
                    .iter()
                    .map(|&p| players.name(p).to_string())
                    .collect(),
            };
            logger.selected(step, &result.player_name, max_attribution, correlates.conditioned.len());
            steps.push(result);
        };

        logger.stopped(steps.len(), &stop_reason);
        Ok(SelectionReport { steps, stop_reason })
    }
}

// =============================================================================
// Entry points
// =============================================================================

/// Greedy iterative selection, returning the selected steps.
///
/// Player granularity follows `config.level`; group level needs
/// [`greedy_iterative`] to supply the partition.
pub fn greedy_iterative_shapley(
    model: &dyn Predictor,
    background: ArrayView2<'_, f64>,
    explain: ArrayView2<'_, f64>,
    feature_names: Option<&[String]>,
    config: &GreedyConfig,
) -> Result<Vec<StepResult>, ExplainError> {
    GreedySelector::new(config)
        .run(model, background, explain, feature_names)
        .map(|report| report.steps)
}

/// Greedy iterative selection at feature or group level.
///
/// `level` overrides `config.level`.
pub fn greedy_iterative(
    level: Level,
    partition: Option<&GroupPartition>,
    model: &dyn Predictor,
    background: ArrayView2<'_, f64>,
    explain: ArrayView2<'_, f64>,
    feature_names: Option<&[String]>,
    config: &GreedyConfig,
) -> Result<Vec<StepResult>, ExplainError> {
    let config = GreedyConfig {
        level,
        ..config.clone()
    };
    let mut selector = GreedySelector::new(&config);
    if let Some(partition) = partition {
        selector = selector.with_partition(partition);
    }
    selector
        .run(model, background, explain, feature_names)
        .map(|report| report.steps)
}

//! Error types.
//!
//! Configuration and capability errors are raised before any attribution
//! work starts. [`ExplainError`] is the umbrella type returned by every
//! public entry point.

// =============================================================================
// ConfigError
// =============================================================================

/// Invalid configuration or malformed input data.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// `n_steps` must be at least 1.
    #[error("n_steps must be >= 1, got {0}")]
    InvalidNSteps(usize),

    /// `threshold` must be finite and non-negative.
    #[error("threshold must be finite and >= 0, got {0}")]
    InvalidThreshold(f64),

    /// `corr_threshold` must lie in `[0, 1]`.
    #[error("corr_threshold must be in [0, 1], got {0}")]
    InvalidCorrThreshold(f64),

    /// An approximate enumeration backend must keep at least one background row.
    #[error("background_samples must be >= 1 when set")]
    InvalidBackgroundSamples,

    /// A group references an input index beyond the input dimensionality.
    #[error("group '{group}' references input {input}, but there are only {n_inputs} inputs")]
    InputOutOfRange {
        group: String,
        input: usize,
        n_inputs: usize,
    },

    /// An input was assigned to more than one group.
    #[error("input {input} is assigned to both '{first}' and '{second}'")]
    OverlappingGroups {
        input: usize,
        first: String,
        second: String,
    },

    /// A group was declared without members.
    #[error("group '{0}' has no member inputs")]
    EmptyGroup(String),

    /// Two groups (or a group and a feature singleton) share a name.
    #[error("player name '{0}' is declared more than once")]
    DuplicateName(String),

    /// `feature_names` length differs from the input dimensionality.
    #[error("expected {expected} feature names, got {actual}")]
    FeatureNamesLen { expected: usize, actual: usize },

    /// A data matrix has the wrong number of columns for the model.
    #[error("{what} has {actual} columns, model expects {expected}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A data matrix has no rows.
    #[error("{0} must contain at least one row")]
    EmptyData(&'static str),

    /// Group-level selection was requested without a group partition.
    #[error("group-level attribution requires a group partition")]
    MissingGroupPartition,

    /// The explained output index does not exist.
    #[error("output {output} out of range for a model with {n_outputs} outputs")]
    OutputOutOfRange { output: usize, n_outputs: usize },
}

// =============================================================================
// CapabilityError
// =============================================================================

/// The requested computation is not supported for this model or size.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CapabilityError {
    /// Exact enumeration over this many players is intractable.
    #[error(
        "exact enumeration over {n_players} players exceeds the limit of {max}; \
         group the inputs, use sum aggregation, or a structure-aware backend"
    )]
    TooManyPlayers { n_players: usize, max: usize },

    /// The backend cannot explain this kind of model.
    #[error("backend '{backend}' does not support {model} models")]
    BackendUnsupported {
        backend: &'static str,
        model: &'static str,
    },

    /// The model cannot produce usable predictions.
    #[error("model is not usable for prediction: {0}")]
    ModelUnusable(&'static str),

    /// The worker thread pool could not be created.
    #[error("failed to create thread pool: {0}")]
    ThreadPool(String),
}

// =============================================================================
// ExplainError
// =============================================================================

/// Error returned by attribution and selection entry points.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExplainError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// A coalition referenced a player outside the active player set.
    #[error("player {player} does not exist in a set of {n_players} players")]
    UnknownPlayer { player: usize, n_players: usize },

    /// The run was cancelled externally; no results are returned.
    #[error("selection cancelled before step {step}")]
    Cancelled { step: usize },
}

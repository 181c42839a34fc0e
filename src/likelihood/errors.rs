//! Errors for data loading, tensor alignment, and likelihood evaluation.
//!
//! This module defines [`LikelihoodError`], the failure surface shared by the
//! data tensor builder, the species-link table, the tensor adapter, and the
//! likelihood engine, plus the alias [`LikResult`].
//!
//! ## Conventions
//! - **Indices are 0-based** (rows, columns, axes, parameters, fit times).
//! - Configuration errors (missing/ambiguous time column, species-link table
//!   inconsistent with the data) are fatal and surface before any fitting.
//! - A stale state space is **not** an error; the engine recovers from it by
//!   asking the solver for a fresh projection.
//! - Failures raised by external collaborators (solver, distortion operator)
//!   arrive as `anyhow::Error` and are captured as
//!   [`LikelihoodError::Collaborator`] with their display text.

/// Result alias for likelihood-layer operations.
pub type LikResult<T> = Result<T, LikelihoodError>;

/// Unified error type for the likelihood layer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LikelihoodError {
    // ---- Data loading ----
    /// No column name identifies a time axis.
    #[error("Data error: no time column found among {columns:?}")]
    MissingTimeColumn { columns: Vec<String> },

    /// More than one column name looks like a time axis.
    #[error("Data error: ambiguous time column, candidates are {candidates:?}")]
    AmbiguousTimeColumn { candidates: Vec<String> },

    /// A column referenced by the species-link table is absent from the data.
    #[error("Data error: column '{column}' referenced by the species-link table is missing")]
    MissingDataColumn { column: String },

    /// A row has a different number of entries than the header.
    #[error("Data error: row {row} has {found} entries, expected {expected}")]
    RaggedRow { row: usize, expected: usize, found: usize },

    /// A measured value is not a finite non-negative integer.
    #[error("Data error: row {row}, column '{column}' holds {value}: {reason}")]
    InvalidMeasurement { row: usize, column: String, value: f64, reason: &'static str },

    /// A time value is not finite.
    #[error("Data error: row {row} has non-finite time {value}")]
    NonFiniteTime { row: usize, value: f64 },

    /// Two pre-binned slices share a measurement time.
    #[error("Data error: time {value} appears in more than one slice")]
    DuplicateTime { value: f64 },

    /// The data table has no rows.
    #[error("Data error: data table is empty")]
    EmptyData,

    // ---- Species link ----
    /// Species names and link entries have different lengths.
    #[error("Species link error: {species} species but {links} link entries")]
    LinkLengthMismatch { species: usize, links: usize },

    /// No species is linked to a data column.
    #[error("Species link error: no species is linked to a data column")]
    NoObservedSpecies,

    /// Two species map to the same data column.
    #[error("Species link error: column '{column}' is linked to more than one species")]
    DuplicateLinkedColumn { column: String },

    // ---- Tensors and alignment ----
    /// Reduced model tensor and data tensor disagree on the number of axes.
    #[error(
        "Alignment error: model tensor has {model} axes but data tensor has {data}; \
         the species-link table does not match the data columns"
    )]
    AxisCountMismatch { model: usize, data: usize },

    /// An axis index is outside the tensor's dimensionality.
    #[error("Tensor error: axis {axis} out of range for a {ndim}-axis tensor")]
    AxisOutOfRange { axis: usize, ndim: usize },

    /// Probability/sensitivity vector length differs from the state count.
    #[error("Tensor error: expected {expected} values, found {found}")]
    ValueLengthMismatch { expected: usize, found: usize },

    /// Sensitivity tensor shape differs from its probability tensor.
    #[error(
        "Tensor error: sensitivity shape {found:?} differs from probability shape {expected:?}"
    )]
    SensitivityShapeMismatch { expected: Vec<usize>, found: Vec<usize> },

    // ---- State space ----
    /// A state space must enumerate at least one state.
    #[error("State space error: no states enumerated")]
    EmptyStateSpace,

    /// A state has the wrong number of species counts.
    #[error("State space error: state {index} has {found} entries, expected {expected}")]
    StateDimMismatch { index: usize, expected: usize, found: usize },

    // ---- Engine ----
    /// Fit-time index does not refer to a data time bin.
    #[error("Likelihood error: fit time index {index} out of range for {len} data times")]
    FitTimeOutOfRange { index: usize, len: usize },

    /// The solver returned no evaluation times.
    #[error("Likelihood error: model solution contains no time points")]
    EmptySolution,

    /// The solver returned a number of distributions different from its times.
    #[error("Likelihood error: {times} model times but {distributions} distributions")]
    SolutionLengthMismatch { times: usize, distributions: usize },

    /// Sensitivity count differs from the parameter count.
    #[error("Likelihood error: expected {expected} sensitivities per time point, found {found}")]
    SensitivityCountMismatch { expected: usize, found: usize },

    /// A gradient was requested from a solution without sensitivities.
    #[error("Likelihood error: gradient requested but no sensitivities were supplied")]
    MissingSensitivities,

    /// Parameters must be finite and strictly positive rates.
    #[error("Likelihood error: parameter {index} = {value}: {reason}")]
    InvalidParameter { index: usize, value: f64, reason: &'static str },

    /// Prior dimension differs from the parameter vector.
    #[error("Prior error: prior has {expected} entries, parameter vector has {found}")]
    PriorLengthMismatch { expected: usize, found: usize },

    // ---- Options ----
    /// Probability floor must be finite and strictly positive.
    #[error("Options error: probability floor {value}: {reason}")]
    InvalidFloor { value: f64, reason: &'static str },

    /// FSP tolerance must be finite and strictly positive when set.
    #[error("Options error: FSP tolerance {value}: {reason}")]
    InvalidFspTolerance { value: f64, reason: &'static str },

    // ---- Collaborators ----
    /// Failure raised by an external solver or distortion operator.
    #[error("Collaborator error: {0}")]
    Collaborator(String),
}

impl From<anyhow::Error> for LikelihoodError {
    fn from(err: anyhow::Error) -> Self {
        LikelihoodError::Collaborator(err.to_string())
    }
}

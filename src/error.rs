/// Errors produced while building likelihoods, fitting posterior states, or
/// extending them with new observations.
///
/// Every variant carries the offending values so callers can decide whether
/// to repair the input, retry with a batch fit, or give up. Use
/// [`Error::kind`] to branch on the broad category.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Returned when features and targets do not have the same number of rows.
    #[error("row count mismatch: {features} feature rows but {targets} target rows")]
    RowCountMismatch {
        /// Number of feature rows.
        features: usize,
        /// Number of target rows.
        targets: usize,
    },

    /// Returned when an input array contains `NaN` or an infinity.
    #[error("non-finite value {value} in {name} at row {row}, column {col}")]
    NonFinite {
        /// Which input the value was found in.
        name: &'static str,
        /// Row of the offending entry.
        row: usize,
        /// Column of the offending entry.
        col: usize,
        /// The offending value.
        value: f64,
    },

    /// Returned when the noise variance is below [`NOISE_VARIANCE_LOWER_BOUND`](crate::NOISE_VARIANCE_LOWER_BOUND)
    /// or not finite.
    #[error("noise variance {value} must be finite and at least {floor}")]
    NoiseVarianceBelowFloor {
        /// The rejected noise variance.
        value: f64,
        /// The enforced lower bound.
        floor: f64,
    },

    /// Returned when the target matrix has zero columns.
    #[error("targets must have at least one column")]
    EmptyTargets,

    /// Returned when a kernel or mean hyperparameter is out of its domain.
    #[error("invalid hyperparameter '{name}': {value}")]
    InvalidHyperparameter {
        /// Name of the hyperparameter.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// Returned when a configuration option is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// Returned when vectors or matrices disagree on their dimensionality.
    #[error("dimension mismatch in {what}: expected {expected} but got {got}")]
    DimensionMismatch {
        /// What was being compared.
        what: &'static str,
        /// The expected size.
        expected: usize,
        /// The actual size.
        got: usize,
    },

    /// Returned when Cholesky factorization fails even after all jitter retries.
    #[error(
        "cholesky factorization of a {size}x{size} matrix failed after {attempts} attempts (last jitter {last_jitter:e})"
    )]
    CholeskyFailed {
        /// Order of the matrix.
        size: usize,
        /// Number of factorization attempts, including the unjittered one.
        attempts: usize,
        /// Jitter added to the diagonal on the last attempt.
        last_jitter: f64,
    },

    /// Returned when an incremental update would produce a non-positive
    /// diagonal entry. Callers may fall back to a batch fit.
    #[error("incremental update of row {index} lost positive-definiteness (radicand {radicand:e})")]
    NonPositiveRadicand {
        /// The computed squared diagonal entry.
        radicand: f64,
        /// Index of the row being appended.
        index: usize,
    },

    /// Returned when a triangular solve meets a zero on the factor's diagonal.
    #[error("triangular solve against a singular {size}x{size} factor")]
    SingularFactor {
        /// Order of the factor.
        size: usize,
    },
}

/// Broad category of an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The inputs were rejected before any computation took place.
    Validation,
    /// The computation ran but lost positive-definiteness.
    NumericalInstability,
    /// Feature or target dimensionality disagrees across calls.
    Dimension,
}

impl Error {
    /// Returns the category this error belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RowCountMismatch { .. }
            | Self::NonFinite { .. }
            | Self::NoiseVarianceBelowFloor { .. }
            | Self::EmptyTargets
            | Self::InvalidHyperparameter { .. }
            | Self::InvalidConfig(_) => ErrorKind::Validation,
            Self::CholeskyFailed { .. }
            | Self::NonPositiveRadicand { .. }
            | Self::SingularFactor { .. } => ErrorKind::NumericalInstability,
            Self::DimensionMismatch { .. } => ErrorKind::Dimension,
        }
    }

    /// Returns `true` if a batch refit over the same data may succeed where
    /// this operation failed.
    #[must_use]
    pub fn is_recoverable_by_refit(&self) -> bool {
        matches!(self, Self::NonPositiveRadicand { .. })
    }
}

pub type Result<T> = core::result::Result<T, Error>;

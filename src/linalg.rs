//! Cholesky factorization with bounded jitter escalation and triangular solves.
//!
//! Factorization is attempted first on the matrix as given. If that fails,
//! the diagonal is regularized with `scale · initial · growth^(k-1)` for
//! `k = 1..=max_retries`, where `scale` is the mean absolute diagonal.
//! Exhausting the retries is an [`Error::CholeskyFailed`], never a panic.
//! The triangular solves report a zero pivot as [`Error::SingularFactor`].

use nalgebra::DMatrix;
use nalgebra::linalg::Cholesky;

use crate::error::{Error, Result};

/// Default number of jittered retries after the first attempt.
const DEFAULT_MAX_RETRIES: usize = 10;
/// Default ratio between successive jitter levels.
const DEFAULT_GROWTH: f64 = 10.0;
/// Largest accepted number of jittered retries.
pub const MAX_JITTER_RETRIES: usize = 100;

/// Configuration of the escalating diagonal jitter used when a covariance
/// matrix is numerically indefinite.
///
/// # Examples
///
/// ```
/// use gp_posterior::JitterConfig;
///
/// let config = JitterConfig::new(1e-12, 10.0, 4).unwrap();
/// assert_eq!(config.max_retries(), 4);
///
/// // Disable jitter entirely
/// let strict = JitterConfig::none();
/// assert_eq!(strict.max_retries(), 0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "JitterConfigParams")
)]
pub struct JitterConfig {
    initial_relative_jitter: f64,
    growth_factor: f64,
    max_retries: usize,
}

/// Unchecked wire form of [`JitterConfig`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct JitterConfigParams {
    initial_relative_jitter: f64,
    growth_factor: f64,
    max_retries: usize,
}

#[cfg(feature = "serde")]
impl TryFrom<JitterConfigParams> for JitterConfig {
    type Error = Error;

    fn try_from(raw: JitterConfigParams) -> Result<Self> {
        Self::new(raw.initial_relative_jitter, raw.growth_factor, raw.max_retries)
    }
}

impl Default for JitterConfig {
    /// Ten decades starting at `10 · f64::EPSILON` relative to the matrix scale.
    fn default() -> Self {
        Self {
            initial_relative_jitter: f64::EPSILON * DEFAULT_GROWTH,
            growth_factor: DEFAULT_GROWTH,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl JitterConfig {
    /// Creates a jitter schedule.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if `initial_relative_jitter` is not a
    /// finite positive number, if `growth_factor` is not finite and greater
    /// than one, or if `max_retries` exceeds [`MAX_JITTER_RETRIES`].
    pub fn new(initial_relative_jitter: f64, growth_factor: f64, max_retries: usize) -> Result<Self> {
        if !(initial_relative_jitter.is_finite() && initial_relative_jitter > 0.0) {
            return Err(Error::InvalidConfig(
                "initial relative jitter must be finite and positive",
            ));
        }
        if !(growth_factor.is_finite() && growth_factor > 1.0) {
            return Err(Error::InvalidConfig(
                "jitter growth factor must be finite and greater than 1",
            ));
        }
        if max_retries > MAX_JITTER_RETRIES {
            return Err(Error::InvalidConfig("too many jitter retries"));
        }
        Ok(Self {
            initial_relative_jitter,
            growth_factor,
            max_retries,
        })
    }

    /// A schedule that never adds jitter: a failed factorization is reported
    /// immediately.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn initial_relative_jitter(&self) -> f64 {
        self.initial_relative_jitter
    }

    #[must_use]
    pub fn growth_factor(&self) -> f64 {
        self.growth_factor
    }

    #[must_use]
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Jitter for attempt `attempt` (0 is the unjittered attempt).
    pub(crate) fn jitter_at(&self, attempt: usize, scale: f64) -> f64 {
        if attempt == 0 {
            0.0
        } else {
            let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
            scale * self.initial_relative_jitter * self.growth_factor.powi(exponent)
        }
    }
}

/// A lower-triangular Cholesky factor and the jitter that was needed to get it.
#[derive(Clone, Debug)]
pub(crate) struct Factor {
    pub(crate) l: DMatrix<f64>,
    pub(crate) jitter: f64,
}

/// Factorize a symmetric matrix, escalating diagonal jitter on failure.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn cholesky_with_jitter(a: &DMatrix<f64>, config: &JitterConfig) -> Result<Factor> {
    let n = a.nrows();
    if n == 0 {
        return Ok(Factor {
            l: DMatrix::zeros(0, 0),
            jitter: 0.0,
        });
    }

    let scale = a.diagonal().iter().map(|d| d.abs()).sum::<f64>() / n as f64;
    let scale = if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    };

    let mut last_jitter = 0.0;
    for attempt in 0..=config.max_retries {
        let jitter = config.jitter_at(attempt, scale);
        let mut m = a.clone();
        for i in 0..n {
            m[(i, i)] += jitter;
        }
        if let Some(l) = try_cholesky(m) {
            if attempt > 0 {
                trace_debug!(n, attempt, jitter, "cholesky succeeded after adding jitter");
            }
            return Ok(Factor { l, jitter });
        }
        trace_debug!(n, attempt, jitter, "cholesky attempt failed");
        last_jitter = jitter;
    }

    trace_info!(n, last_jitter, "cholesky failed after exhausting jitter retries");
    Err(Error::CholeskyFailed {
        size: n,
        attempts: config.max_retries + 1,
        last_jitter,
    })
}

/// Single factorization attempt. Rejects factors with a non-positive or
/// non-finite diagonal, which `nalgebra` lets through for singular input.
fn try_cholesky(m: DMatrix<f64>) -> Option<DMatrix<f64>> {
    let l = Cholesky::new(m)?.unpack();
    let valid = l.diagonal().iter().all(|d| d.is_finite() && *d > 0.0)
        && l.iter().all(|v| v.is_finite());
    valid.then_some(l)
}

/// Solve `L·X = B` for lower-triangular `L`. Entries above the diagonal
/// are ignored.
pub(crate) fn forward_solve(l: &DMatrix<f64>, b: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    l.solve_lower_triangular(b)
        .ok_or(Error::SingularFactor { size: l.nrows() })
}

/// Solve `Lᵗ·X = B` for lower-triangular `L`.
pub(crate) fn backward_solve(l: &DMatrix<f64>, b: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    l.tr_solve_lower_triangular(b)
        .ok_or(Error::SingularFactor { size: l.nrows() })
}

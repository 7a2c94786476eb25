//! Covariance functions over pairs of feature vectors.
//!
//! A [`Kernel`] is a pure, symmetric, positive-semidefinite function
//! `cov(x, y) -> f64`. Kernels carry their own hyperparameters and expose them
//! in an unconstrained *encoded* form (logarithms of the positive parameters)
//! so an external optimizer can tune them through
//! [`MarginalLikelihood`](crate::objective::MarginalLikelihood).
//!
//! | Kernel | Formula | Encoded parameters |
//! |--------|---------|--------------------|
//! | [`Matern52`] | `σ² (1 + √5 r + 5/3 r²) exp(-√5 r)` | `ln ℓ₁ … ln ℓₖ, ln σ²` |
//! | [`SquaredExponential`] | `σ² exp(-r² / 2)` | `ln ℓ₁ … ln ℓₖ, ln σ²` |
//!
//! where `r² = Σ ((xᵢ - yᵢ) / ℓᵢ)²`. With a single lengthscale the kernel is
//! isotropic; with one per dimension it uses automatic relevance
//! determination (ARD).

mod matern52;
mod squared_exponential;

pub use matern52::Matern52;
pub use squared_exponential::SquaredExponential;

use crate::error::{Error, Result};

/// A covariance function over D-dimensional feature vectors.
///
/// Implementations must be symmetric (`covariance(x, y) == covariance(y, x)`)
/// and positive-semidefinite over every finite set of points. Kernels are
/// shared across threads behind an `Arc`, so they must be `Send + Sync`.
pub trait Kernel: Send + Sync + core::fmt::Debug {
    /// Dimensionality of the feature vectors this kernel accepts.
    fn dimension(&self) -> usize;

    /// Covariance between two feature vectors.
    ///
    /// Both slices must have [`dimension`](Kernel::dimension) entries.
    /// Callers in this crate check widths before evaluating; a mismatch
    /// panics in debug builds.
    fn covariance(&self, x: &[f64], y: &[f64]) -> f64;

    /// Prior variance `cov(x, x)`.
    fn diagonal(&self, x: &[f64]) -> f64 {
        self.covariance(x, x)
    }

    /// Number of encoded hyperparameters.
    fn num_hyperparameters(&self) -> usize;

    /// Current hyperparameters in encoded (unconstrained) form.
    fn hyperparameters(&self) -> Vec<f64>;

    /// Replace the hyperparameters from their encoded form.
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if `encoded` has the wrong length,
    /// or `Error::InvalidHyperparameter` if a decoded value is not a finite
    /// positive number.
    fn set_hyperparameters(&mut self, encoded: &[f64]) -> Result<()>;
}

/// Lengthscale and signal-variance parameters shared by the stationary kernels.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "StationaryParams")
)]
pub(crate) struct Stationary {
    pub(crate) dimension: usize,
    /// One entry (isotropic) or `dimension` entries (ARD).
    pub(crate) lengthscales: Vec<f64>,
    pub(crate) variance: f64,
}

/// Unchecked wire form of [`Stationary`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct StationaryParams {
    dimension: usize,
    lengthscales: Vec<f64>,
    variance: f64,
}

#[cfg(feature = "serde")]
impl TryFrom<StationaryParams> for Stationary {
    type Error = Error;

    fn try_from(raw: StationaryParams) -> Result<Self> {
        if let [l] = raw.lengthscales[..] {
            Self::isotropic(raw.dimension, l, raw.variance)
        } else if raw.lengthscales.len() == raw.dimension {
            Self::ard(raw.lengthscales, raw.variance)
        } else {
            Err(Error::DimensionMismatch {
                what: "kernel lengthscales",
                expected: raw.dimension,
                got: raw.lengthscales.len(),
            })
        }
    }
}

impl Stationary {
    pub(crate) fn isotropic(dimension: usize, lengthscale: f64, variance: f64) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::InvalidConfig("kernel dimension must be positive"));
        }
        check_positive("lengthscale", lengthscale)?;
        check_positive("variance", variance)?;
        Ok(Self {
            dimension,
            lengthscales: vec![lengthscale],
            variance,
        })
    }

    pub(crate) fn ard(lengthscales: Vec<f64>, variance: f64) -> Result<Self> {
        if lengthscales.is_empty() {
            return Err(Error::InvalidConfig("kernel dimension must be positive"));
        }
        for &l in &lengthscales {
            check_positive("lengthscale", l)?;
        }
        check_positive("variance", variance)?;
        Ok(Self {
            dimension: lengthscales.len(),
            lengthscales,
            variance,
        })
    }

    /// Squared scaled distance `Σ ((xᵢ - yᵢ) / ℓᵢ)²`.
    pub(crate) fn scaled_sq_dist(&self, x: &[f64], y: &[f64]) -> f64 {
        debug_assert_eq!(x.len(), self.dimension, "feature width");
        debug_assert_eq!(y.len(), self.dimension, "feature width");
        let mut r_sq = 0.0;
        if let [l] = self.lengthscales[..] {
            for (a, b) in x.iter().zip(y) {
                let diff = (a - b) / l;
                r_sq += diff * diff;
            }
        } else {
            for ((a, b), l) in x.iter().zip(y).zip(&self.lengthscales) {
                let diff = (a - b) / l;
                r_sq += diff * diff;
            }
        }
        r_sq
    }

    pub(crate) fn num_hyperparameters(&self) -> usize {
        self.lengthscales.len() + 1
    }

    pub(crate) fn encode(&self) -> Vec<f64> {
        self.lengthscales
            .iter()
            .chain(core::iter::once(&self.variance))
            .map(|v| v.ln())
            .collect()
    }

    pub(crate) fn decode(&mut self, encoded: &[f64]) -> Result<()> {
        let expected = self.num_hyperparameters();
        if encoded.len() != expected {
            return Err(Error::DimensionMismatch {
                what: "kernel hyperparameters",
                expected,
                got: encoded.len(),
            });
        }
        let (ls, var) = encoded.split_at(expected - 1);
        let lengthscales = ls
            .iter()
            .map(|&t| decode_positive("lengthscale", t))
            .collect::<Result<Vec<_>>>()?;
        let variance = decode_positive("variance", var[0])?;
        self.lengthscales = lengthscales;
        self.variance = variance;
        Ok(())
    }
}

pub(crate) fn check_positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidHyperparameter { name, value })
    }
}

/// Inverse of the log encoding used for positive hyperparameters.
pub(crate) fn decode_positive(name: &'static str, encoded: f64) -> Result<f64> {
    let value = encoded.exp();
    check_positive(name, value)?;
    Ok(value)
}

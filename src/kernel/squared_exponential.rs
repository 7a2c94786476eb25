use super::{Kernel, Stationary};
use crate::error::Result;

/// Squared-exponential (RBF) kernel with isotropic or ARD lengthscales.
///
/// `k(x1, x2) = σ² exp(-r² / 2)`, `r² = Σ ((x1_i - x2_i) / l_i)²`.
///
/// Produces infinitely smooth sample paths; prefer [`Matern52`](super::Matern52)
/// unless the objective is known to be very smooth.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SquaredExponential {
    params: Stationary,
}

impl SquaredExponential {
    /// Creates an isotropic kernel with unit lengthscale and unit variance.
    ///
    /// # Panics
    ///
    /// Panics if `dimension` is zero.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        assert!(dimension > 0, "kernel dimension must be positive");
        Self {
            params: Stationary {
                dimension,
                lengthscales: vec![1.0],
                variance: 1.0,
            },
        }
    }

    /// Creates an isotropic kernel sharing one lengthscale across dimensions.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if `dimension` is zero, or
    /// `Error::InvalidHyperparameter` for non-positive parameters.
    pub fn isotropic(dimension: usize, lengthscale: f64, variance: f64) -> Result<Self> {
        Ok(Self {
            params: Stationary::isotropic(dimension, lengthscale, variance)?,
        })
    }

    /// Creates an ARD kernel with one lengthscale per dimension.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if `lengthscales` is empty, or
    /// `Error::InvalidHyperparameter` for non-positive parameters.
    pub fn ard(lengthscales: Vec<f64>, variance: f64) -> Result<Self> {
        Ok(Self {
            params: Stationary::ard(lengthscales, variance)?,
        })
    }

    #[must_use]
    pub fn lengthscales(&self) -> &[f64] {
        &self.params.lengthscales
    }

    #[must_use]
    pub fn variance(&self) -> f64 {
        self.params.variance
    }
}

impl Kernel for SquaredExponential {
    fn dimension(&self) -> usize {
        self.params.dimension
    }

    fn covariance(&self, x: &[f64], y: &[f64]) -> f64 {
        self.params.variance * (-0.5 * self.params.scaled_sq_dist(x, y)).exp()
    }

    fn diagonal(&self, _x: &[f64]) -> f64 {
        self.params.variance
    }

    fn num_hyperparameters(&self) -> usize {
        self.params.num_hyperparameters()
    }

    fn hyperparameters(&self) -> Vec<f64> {
        self.params.encode()
    }

    fn set_hyperparameters(&mut self, encoded: &[f64]) -> Result<()> {
        self.params.decode(encoded)
    }
}

use super::{Kernel, Stationary};
use crate::error::Result;

/// Precomputed √5 constant.
const SQRT_5: f64 = 2.236_067_977_499_79;

/// Matérn 5/2 kernel with isotropic or ARD lengthscales.
///
/// `k(x1, x2) = σ² (1 + √5 r + 5/3 r²) exp(-√5 r)`
/// where `r = sqrt(Σ ((x1_i - x2_i) / l_i)²)`.
///
/// Twice differentiable sample paths make it the usual default for
/// Bayesian optimization of hyperparameters.
///
/// # Examples
///
/// ```
/// use gp_posterior::kernel::{Kernel, Matern52};
///
/// let k = Matern52::new(2);
/// assert!((k.covariance(&[0.0, 0.0], &[0.0, 0.0]) - 1.0).abs() < 1e-12);
///
/// let ard = Matern52::ard(vec![0.5, 2.0], 1.5).unwrap();
/// assert_eq!(ard.dimension(), 2);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Matern52 {
    params: Stationary,
}

impl Matern52 {
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
    /// `Error::InvalidHyperparameter` if `lengthscale` or `variance` is not a
    /// finite positive number.
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
    /// `Error::InvalidHyperparameter` if any value is not a finite positive
    /// number.
    pub fn ard(lengthscales: Vec<f64>, variance: f64) -> Result<Self> {
        Ok(Self {
            params: Stationary::ard(lengthscales, variance)?,
        })
    }

    /// The lengthscales: one entry when isotropic, `dimension` entries for ARD.
    #[must_use]
    pub fn lengthscales(&self) -> &[f64] {
        &self.params.lengthscales
    }

    /// The signal variance `σ²`.
    #[must_use]
    pub fn variance(&self) -> f64 {
        self.params.variance
    }
}

impl Kernel for Matern52 {
    fn dimension(&self) -> usize {
        self.params.dimension
    }

    fn covariance(&self, x: &[f64], y: &[f64]) -> f64 {
        let r_sq = self.params.scaled_sq_dist(x, y);
        let r = r_sq.sqrt();
        let sqrt5_r = SQRT_5 * r;
        self.params.variance * (1.0 + sqrt5_r + 5.0 / 3.0 * r_sq) * (-sqrt5_r).exp()
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

//! Negative log marginal likelihood as a black-box objective over encoded
//! hyperparameters.
//!
//! The parameter vector is laid out as
//!
//! | Slice | Meaning | Encoding |
//! |-------|---------|----------|
//! | `0..k` | kernel hyperparameters | see [`Kernel::hyperparameters`] |
//! | `k..k+m` | mean hyperparameters | see [`MeanFunction::hyperparameters`] |
//! | `k+m` | noise variance | `ln(σ² - floor)` |
//!
//! Every point of `ℝ^(k+m+1)` decodes to a valid model, so an unconstrained
//! optimizer can search freely. Gradients are central finite differences;
//! the optimizer loop itself lives outside this crate.
//!
//! # Examples
//!
//! ```
//! use gp_posterior::kernel::Matern52;
//! use gp_posterior::mean::ConstantMean;
//! use gp_posterior::objective::MarginalLikelihood;
//! use gp_posterior::data;
//!
//! let x = data::features_from_rows(&[vec![0.0], vec![0.5], vec![1.0]]).unwrap();
//! let y = data::targets_from_values(&[0.1, 0.5, 0.3]).unwrap();
//! let objective = MarginalLikelihood::new(
//!     Matern52::new(1),
//!     ConstantMean::new(0.0).unwrap(),
//!     0.01,
//!     x,
//!     y,
//! )
//! .unwrap();
//!
//! let theta = objective.initial_point();
//! let (value, gradient) = objective.value_and_gradient(&theta).unwrap();
//! assert!(value.is_finite());
//! assert_eq!(gradient.len(), objective.num_parameters());
//! ```

use nalgebra::DMatrix;

use crate::error::{Error, Result};
use crate::kernel::Kernel;
use crate::likelihood::{Likelihood, NOISE_VARIANCE_LOWER_BOUND, check_noise_variance};
use crate::linalg::JitterConfig;
use crate::mean::MeanFunction;
use crate::posterior::PosteriorState;

/// Default relative step for central differences.
const DEFAULT_STEP: f64 = 1e-6;

/// Step configuration for finite-difference gradients.
///
/// Parameter `θᵢ` is perturbed by `± step · max(1, |θᵢ|)`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "FiniteDifferenceParams")
)]
pub struct FiniteDifference {
    step: f64,
}

/// Unchecked wire form of [`FiniteDifference`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct FiniteDifferenceParams {
    step: f64,
}

#[cfg(feature = "serde")]
impl TryFrom<FiniteDifferenceParams> for FiniteDifference {
    type Error = Error;

    fn try_from(raw: FiniteDifferenceParams) -> Result<Self> {
        Self::new(raw.step)
    }
}

impl Default for FiniteDifference {
    fn default() -> Self {
        Self { step: DEFAULT_STEP }
    }
}

impl FiniteDifference {
    /// Creates a finite-difference configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if `step` is not finite and positive.
    pub fn new(step: f64) -> Result<Self> {
        if step.is_finite() && step > 0.0 {
            Ok(Self { step })
        } else {
            Err(Error::InvalidConfig(
                "finite-difference step must be finite and positive",
            ))
        }
    }

    #[must_use]
    pub fn step(&self) -> f64 {
        self.step
    }
}

/// Negative log marginal likelihood of fixed data as a function of encoded
/// hyperparameters.
///
/// Each evaluation clones the kernel and mean, applies the decoded
/// parameters, and runs a batch [`PosteriorState::fit`]. Nothing is cached
/// between calls, so evaluations can run concurrently.
#[derive(Clone, Debug)]
pub struct MarginalLikelihood<K, M> {
    kernel: K,
    mean: M,
    noise_variance: f64,
    features: DMatrix<f64>,
    targets: DMatrix<f64>,
    jitter: JitterConfig,
    finite_difference: FiniteDifference,
}

impl<K, M> MarginalLikelihood<K, M>
where
    K: Kernel + Clone + 'static,
    M: MeanFunction + Clone + 'static,
{
    /// Creates the objective for the given starting model and data.
    ///
    /// # Errors
    ///
    /// Returns the validation errors of [`PosteriorState::fit`] for the data,
    /// or `Error::NoiseVarianceBelowFloor` for the starting noise variance.
    pub fn new(
        kernel: K,
        mean: M,
        noise_variance: f64,
        features: DMatrix<f64>,
        targets: DMatrix<f64>,
    ) -> Result<Self> {
        check_noise_variance(noise_variance)?;
        let objective = Self {
            kernel,
            mean,
            noise_variance,
            features,
            targets,
            jitter: JitterConfig::default(),
            finite_difference: FiniteDifference::default(),
        };
        // Surface data and noise problems now rather than on the first evaluation.
        objective.value(&objective.initial_point())?;
        Ok(objective)
    }

    /// Sets the jitter schedule used by every evaluation.
    #[must_use]
    pub fn with_jitter(mut self, jitter: JitterConfig) -> Self {
        self.jitter = jitter;
        self
    }

    /// Sets the finite-difference step used by [`value_and_gradient`](Self::value_and_gradient).
    #[must_use]
    pub fn with_finite_difference(mut self, finite_difference: FiniteDifference) -> Self {
        self.finite_difference = finite_difference;
        self
    }

    /// Length of the encoded parameter vector.
    #[must_use]
    pub fn num_parameters(&self) -> usize {
        self.kernel.num_hyperparameters() + self.mean.num_hyperparameters() + 1
    }

    /// Encoded parameters of the starting model.
    #[must_use]
    pub fn initial_point(&self) -> Vec<f64> {
        let mut theta = self.kernel.hyperparameters();
        theta.extend(self.mean.hyperparameters());
        theta.push(encode_noise(self.noise_variance));
        theta
    }

    /// Decodes `theta` into a [`Likelihood`].
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if `theta` has the wrong length, or
    /// `Error::InvalidHyperparameter` if a decoded value leaves its domain
    /// (e.g. an overflowing exponent).
    pub fn likelihood_at(&self, theta: &[f64]) -> Result<Likelihood> {
        if theta.len() != self.num_parameters() {
            return Err(Error::DimensionMismatch {
                what: "hyperparameter vector",
                expected: self.num_parameters(),
                got: theta.len(),
            });
        }
        let (kernel_theta, rest) = theta.split_at(self.kernel.num_hyperparameters());
        let (mean_theta, noise_theta) = rest.split_at(self.mean.num_hyperparameters());

        let mut kernel = self.kernel.clone();
        kernel.set_hyperparameters(kernel_theta)?;
        let mut mean = self.mean.clone();
        mean.set_hyperparameters(mean_theta)?;
        let noise_variance = decode_noise(noise_theta[0])?;

        Likelihood::builder(kernel)
            .mean(mean)
            .noise_variance(noise_variance)
            .jitter(self.jitter)
            .build()
    }

    /// Negative log marginal likelihood at `theta`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`likelihood_at`](Self::likelihood_at) and
    /// [`PosteriorState::fit`].
    pub fn value(&self, theta: &[f64]) -> Result<f64> {
        let likelihood = self.likelihood_at(theta)?;
        let state = PosteriorState::fit(&self.features, &self.targets, &likelihood)?;
        Ok(state.neg_log_likelihood())
    }

    /// Value and central finite-difference gradient at `theta`.
    ///
    /// Costs `2·len(theta) + 1` batch fits.
    ///
    /// # Errors
    ///
    /// Same as [`value`](Self::value), at `theta` or at a perturbed point.
    pub fn value_and_gradient(&self, theta: &[f64]) -> Result<(f64, Vec<f64>)> {
        let value = self.value(theta)?;
        let mut point = theta.to_vec();
        let mut gradient = Vec::with_capacity(theta.len());
        for i in 0..theta.len() {
            let h = self.finite_difference.step * theta[i].abs().max(1.0);
            point[i] = theta[i] + h;
            let plus = self.value(&point)?;
            point[i] = theta[i] - h;
            let minus = self.value(&point)?;
            point[i] = theta[i];
            gradient.push((plus - minus) / (2.0 * h));
        }
        Ok((value, gradient))
    }
}

/// `ln(σ² - floor)`, clamped so the floor itself stays representable.
fn encode_noise(noise_variance: f64) -> f64 {
    (noise_variance - NOISE_VARIANCE_LOWER_BOUND)
        .max(f64::MIN_POSITIVE)
        .ln()
}

fn decode_noise(encoded: f64) -> Result<f64> {
    let value = NOISE_VARIANCE_LOWER_BOUND + encoded.exp();
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::InvalidHyperparameter {
            name: "noise_variance",
            value,
        })
    }
}

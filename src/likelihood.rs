//! Gaussian likelihood: kernel + mean + observation noise.
//!
//! A [`Likelihood`] holds its kernel and mean behind `Arc`s, so cloning it is
//! cheap and every [`PosteriorState`](crate::PosteriorState) can keep its own
//! handle without copying hyperparameters.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};

use crate::data;
use crate::error::{Error, Result};
use crate::kernel::Kernel;
use crate::linalg::{self, Factor, JitterConfig};
use crate::mean::{MeanFunction, ZeroMean};

/// Smallest accepted observation-noise variance. Keeps `K + σ²I` invertible.
pub const NOISE_VARIANCE_LOWER_BOUND: f64 = 1e-9;

/// Default observation-noise variance.
const DEFAULT_NOISE_VARIANCE: f64 = 1e-6;

/// Kernel, mean, and noise variance of a GP regression model.
///
/// # Examples
///
/// ```
/// use gp_posterior::kernel::Matern52;
/// use gp_posterior::mean::ConstantMean;
/// use gp_posterior::Likelihood;
///
/// let likelihood = Likelihood::builder(Matern52::new(1))
///     .mean(ConstantMean::new(0.5).unwrap())
///     .noise_variance(0.01)
///     .build()
///     .unwrap();
/// assert!((likelihood.noise_variance() - 0.01).abs() < 1e-15);
/// ```
#[derive(Clone, Debug)]
pub struct Likelihood {
    kernel: Arc<dyn Kernel>,
    mean: Arc<dyn MeanFunction>,
    noise_variance: f64,
    jitter: JitterConfig,
}

impl Likelihood {
    /// Creates a likelihood with the default jitter schedule.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoiseVarianceBelowFloor` if `noise_variance` is not
    /// finite or is below [`NOISE_VARIANCE_LOWER_BOUND`].
    pub fn new(
        kernel: impl Kernel + 'static,
        mean: impl MeanFunction + 'static,
        noise_variance: f64,
    ) -> Result<Self> {
        Self::builder(kernel)
            .mean(mean)
            .noise_variance(noise_variance)
            .build()
    }

    /// Creates a builder around `kernel` with a zero mean and the default
    /// noise variance (1e-6).
    #[must_use]
    pub fn builder(kernel: impl Kernel + 'static) -> LikelihoodBuilder {
        LikelihoodBuilder::new(Arc::new(kernel))
    }

    /// Creates a builder around an already shared kernel.
    #[must_use]
    pub fn builder_shared(kernel: Arc<dyn Kernel>) -> LikelihoodBuilder {
        LikelihoodBuilder::new(kernel)
    }

    #[must_use]
    pub fn kernel(&self) -> &Arc<dyn Kernel> {
        &self.kernel
    }

    #[must_use]
    pub fn mean(&self) -> &Arc<dyn MeanFunction> {
        &self.mean
    }

    #[must_use]
    pub fn noise_variance(&self) -> f64 {
        self.noise_variance
    }

    #[must_use]
    pub fn jitter_config(&self) -> &JitterConfig {
        &self.jitter
    }

    /// Dimensionality of the features this likelihood accepts.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.kernel.dimension()
    }

    /// Returns a copy with a different noise variance, sharing kernel and mean.
    ///
    /// # Errors
    ///
    /// Same as [`Likelihood::new`].
    pub fn with_noise_variance(&self, noise_variance: f64) -> Result<Self> {
        check_noise_variance(noise_variance)?;
        Ok(Self {
            noise_variance,
            ..self.clone()
        })
    }

    /// Kernel matrix `K(X, X)` over the rows of `features`.
    #[must_use]
    pub fn covariance_matrix(&self, features: &DMatrix<f64>) -> DMatrix<f64> {
        let rows = data::rows(features);
        let n = rows.len();
        let mut k = DMatrix::zeros(n, n);
        for i in 0..n {
            k[(i, i)] = self.kernel.diagonal(&rows[i]);
            for j in 0..i {
                let v = self.kernel.covariance(&rows[i], &rows[j]);
                k[(i, j)] = v;
                k[(j, i)] = v;
            }
        }
        k
    }

    /// Cross-covariance `K(X1, X2)`, shape N1 × N2.
    #[must_use]
    pub fn cross_covariance(&self, x1: &DMatrix<f64>, x2: &DMatrix<f64>) -> DMatrix<f64> {
        let r1 = data::rows(x1);
        let r2 = data::rows(x2);
        DMatrix::from_fn(r1.len(), r2.len(), |i, j| {
            self.kernel.covariance(&r1[i], &r2[j])
        })
    }

    /// Regularized covariance `K(X, X) + σ²I`.
    #[must_use]
    pub fn regularized_covariance(&self, features: &DMatrix<f64>) -> DMatrix<f64> {
        let mut k = self.covariance_matrix(features);
        for i in 0..k.nrows() {
            k[(i, i)] += self.noise_variance;
        }
        k
    }

    /// Prior mean over the rows of `features`.
    #[must_use]
    pub fn mean_vector(&self, features: &DMatrix<f64>) -> DVector<f64> {
        DVector::from_iterator(
            features.nrows(),
            data::rows(features).iter().map(|r| self.mean.mean(r)),
        )
    }

    /// Prior variance `k(x, x)` over the rows of `features`.
    #[must_use]
    pub fn prior_variance(&self, features: &DMatrix<f64>) -> DVector<f64> {
        DVector::from_iterator(
            features.nrows(),
            data::rows(features).iter().map(|r| self.kernel.diagonal(r)),
        )
    }

    /// Cholesky factor of `K(X, X) + σ²I`, with bounded jitter retries.
    ///
    /// Returns the lower-triangular factor and the extra diagonal jitter that
    /// was needed (0.0 when none).
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if the feature width differs from the
    /// kernel dimension, or `Error::CholeskyFailed` when every retry fails.
    pub fn factorize(&self, features: &DMatrix<f64>) -> Result<(DMatrix<f64>, f64)> {
        self.check_feature_width("features", features.ncols(), features.nrows())?;
        let Factor { l, jitter } =
            linalg::cholesky_with_jitter(&self.regularized_covariance(features), &self.jitter)?;
        Ok((l, jitter))
    }

    /// Checks that feature vectors have the kernel's dimensionality.
    ///
    /// An empty matrix is accepted whatever its column count.
    pub(crate) fn check_feature_width(
        &self,
        what: &'static str,
        width: usize,
        n_rows: usize,
    ) -> Result<()> {
        let expected = self.kernel.dimension();
        if width == expected || (n_rows == 0 && width == 0) {
            Ok(())
        } else {
            Err(Error::DimensionMismatch {
                what,
                expected,
                got: width,
            })
        }
    }
}

/// Builder for a [`Likelihood`].
///
/// Defaults:
/// - mean: [`ZeroMean`]
/// - `noise_variance`: 1e-6
/// - jitter: [`JitterConfig::default`]
#[derive(Clone, Debug)]
#[must_use]
pub struct LikelihoodBuilder {
    kernel: Arc<dyn Kernel>,
    mean: Option<Arc<dyn MeanFunction>>,
    noise_variance: Option<f64>,
    jitter: Option<JitterConfig>,
}

impl LikelihoodBuilder {
    fn new(kernel: Arc<dyn Kernel>) -> Self {
        Self {
            kernel,
            mean: None,
            noise_variance: None,
            jitter: None,
        }
    }

    /// Sets the prior mean function.
    pub fn mean(mut self, mean: impl MeanFunction + 'static) -> Self {
        self.mean = Some(Arc::new(mean));
        self
    }

    /// Sets an already shared prior mean function.
    pub fn mean_shared(mut self, mean: Arc<dyn MeanFunction>) -> Self {
        self.mean = Some(mean);
        self
    }

    /// Sets the observation noise variance added to the kernel diagonal.
    ///
    /// Must be at least [`NOISE_VARIANCE_LOWER_BOUND`]; checked by `build`.
    pub fn noise_variance(mut self, v: f64) -> Self {
        self.noise_variance = Some(v);
        self
    }

    /// Sets the jitter schedule used when factorization fails.
    pub fn jitter(mut self, config: JitterConfig) -> Self {
        self.jitter = Some(config);
        self
    }

    /// Builds the configured [`Likelihood`].
    ///
    /// # Errors
    ///
    /// Returns `Error::NoiseVarianceBelowFloor` for an invalid noise variance.
    pub fn build(self) -> Result<Likelihood> {
        let noise_variance = self.noise_variance.unwrap_or(DEFAULT_NOISE_VARIANCE);
        check_noise_variance(noise_variance)?;
        Ok(Likelihood {
            kernel: self.kernel,
            mean: self.mean.unwrap_or_else(|| Arc::new(ZeroMean)),
            noise_variance,
            jitter: self.jitter.unwrap_or_default(),
        })
    }
}

pub(crate) fn check_noise_variance(value: f64) -> Result<()> {
    if value.is_finite() && value >= NOISE_VARIANCE_LOWER_BOUND {
        Ok(())
    } else {
        Err(Error::NoiseVarianceBelowFloor {
            value,
            floor: NOISE_VARIANCE_LOWER_BOUND,
        })
    }
}

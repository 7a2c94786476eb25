//! Immutable GP posterior states.
//!
//! A [`PosteriorState`] holds the sufficient statistics of a GP posterior:
//! the Cholesky factor `L` of `K(X, X) + σ²I` and the whitened residual
//! `pred_mat = L⁻¹ (Y - m(X))`. It is built once by a batch [`fit`] and then
//! extended one observation at a time by [`update`], which costs O(N²)
//! instead of the O(N³) of a refit and yields the same factor up to
//! rounding.
//!
//! States are never mutated. Every update returns a new state, and the old
//! one remains valid, so states can be shared between threads or kept
//! around for backtracking.
//!
//! # Examples
//!
//! ```
//! use gp_posterior::kernel::Matern52;
//! use gp_posterior::{Likelihood, PosteriorState, data};
//! use gp_posterior::mean::ZeroMean;
//!
//! let likelihood = Likelihood::new(Matern52::new(1), ZeroMean, 0.01).unwrap();
//! let x = data::features_from_rows(&[vec![0.0], vec![0.5]]).unwrap();
//! let y = data::targets_from_values(&[0.0, 0.4]).unwrap();
//!
//! let state = PosteriorState::fit(&x, &y, &likelihood).unwrap();
//! let extended = state.update(&[1.0], &[0.8]).unwrap();
//!
//! assert_eq!(state.num_observations(), 2);
//! assert_eq!(extended.num_observations(), 3);
//! ```

mod incremental;
mod predict;
mod sampling;

pub use predict::Prediction;

use nalgebra::DMatrix;

use crate::data;
use crate::error::{Error, Result};
use crate::likelihood::Likelihood;
use crate::linalg;

/// `ln(2π)`.
const LN_2PI: f64 = 1.837_877_066_409_345_5;

/// Posterior state of a GP given N observations.
#[derive(Clone, Debug)]
pub struct PosteriorState {
    features: DMatrix<f64>,
    targets: DMatrix<f64>,
    /// Lower-triangular `L` with `L Lᵗ = K + (σ² + jitter) I`.
    chol_fact: DMatrix<f64>,
    /// `L⁻¹ (Y - m(X))`, N × P.
    pred_mat: DMatrix<f64>,
    noise_variance: f64,
    jitter: f64,
    likelihood: Likelihood,
}

impl PosteriorState {
    /// Fits a posterior state to all observations at once.
    ///
    /// Factorizes `K(X, X) + σ²I` (with jitter retries from the likelihood's
    /// [`JitterConfig`](crate::JitterConfig)) and whitens the centered
    /// targets. Zero rows yield an empty state whose predictions equal the
    /// prior.
    ///
    /// # Errors
    ///
    /// - `Error::RowCountMismatch` if features and targets differ in rows.
    /// - `Error::EmptyTargets` if targets have no columns.
    /// - `Error::NonFinite` for `NaN` or infinite inputs.
    /// - `Error::DimensionMismatch` if the feature width differs from the kernel dimension.
    /// - `Error::CholeskyFailed` if factorization fails after all retries.
    pub fn fit(
        features: &DMatrix<f64>,
        targets: &DMatrix<f64>,
        likelihood: &Likelihood,
    ) -> Result<Self> {
        validate(features, targets, likelihood)?;
        let n = features.nrows();
        // A 0 × 0 feature matrix carries no width; store it as 0 × D.
        let features = if n == 0 {
            DMatrix::zeros(0, likelihood.dimension())
        } else {
            features.clone()
        };

        let (chol_fact, jitter) = likelihood.factorize(&features)?;
        let centered = centered_targets(targets, &features, likelihood);
        let pred_mat = linalg::forward_solve(&chol_fact, &centered)?;

        trace_debug!(
            n,
            dimension = features.ncols(),
            jitter,
            "fitted posterior state"
        );

        Ok(Self {
            features,
            targets: targets.clone(),
            chol_fact,
            pred_mat,
            noise_variance: likelihood.noise_variance(),
            jitter,
            likelihood: likelihood.clone(),
        })
    }

    /// An empty state with `num_targets` target columns.
    ///
    /// # Errors
    ///
    /// Returns `Error::EmptyTargets` if `num_targets` is zero.
    pub fn empty(likelihood: &Likelihood, num_targets: usize) -> Result<Self> {
        let features = DMatrix::zeros(0, likelihood.dimension());
        let targets = DMatrix::zeros(0, num_targets);
        Self::fit(&features, &targets, likelihood)
    }

    /// The N × D feature matrix.
    #[must_use]
    pub fn features(&self) -> &DMatrix<f64> {
        &self.features
    }

    /// The N × P target matrix.
    #[must_use]
    pub fn targets(&self) -> &DMatrix<f64> {
        &self.targets
    }

    /// Lower-triangular Cholesky factor, N × N.
    #[must_use]
    pub fn chol_fact(&self) -> &DMatrix<f64> {
        &self.chol_fact
    }

    /// Whitened residual `L⁻¹ (Y - m(X))`, N × P.
    #[must_use]
    pub fn pred_mat(&self) -> &DMatrix<f64> {
        &self.pred_mat
    }

    /// Noise variance the state was built with.
    #[must_use]
    pub fn noise_variance(&self) -> f64 {
        self.noise_variance
    }

    /// Extra diagonal regularization the batch factorization needed.
    #[must_use]
    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    #[must_use]
    pub fn likelihood(&self) -> &Likelihood {
        &self.likelihood
    }

    #[must_use]
    pub fn num_observations(&self) -> usize {
        self.features.nrows()
    }

    #[must_use]
    pub fn num_features(&self) -> usize {
        self.features.ncols()
    }

    #[must_use]
    pub fn num_targets(&self) -> usize {
        self.targets.ncols()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.num_observations() == 0
    }

    /// `ln det(K + σ²I) = 2 Σ ln Lᵢᵢ`.
    #[must_use]
    pub fn log_determinant(&self) -> f64 {
        2.0 * self.chol_fact.diagonal().iter().map(|d| d.ln()).sum::<f64>()
    }

    /// Negative log marginal likelihood of the targets, summed over columns.
    ///
    /// `½ ‖pred_mat‖² + P Σ ln Lᵢᵢ + ½ N P ln 2π`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn neg_log_likelihood(&self) -> f64 {
        let n = self.num_observations() as f64;
        let p = self.num_targets() as f64;
        0.5 * self.pred_mat.norm_squared()
            + 0.5 * p * self.log_determinant()
            + 0.5 * n * p * LN_2PI
    }

    /// Dual weights `(K + σ²I)⁻¹ (Y - m(X)) = L⁻ᵗ pred_mat`, N × P.
    ///
    /// # Errors
    ///
    /// Returns `Error::SingularFactor` if the stored factor has a zero on
    /// its diagonal.
    pub fn weights(&self) -> Result<DMatrix<f64>> {
        linalg::backward_solve(&self.chol_fact, &self.pred_mat)
    }

    /// Total diagonal shift of the factored matrix: noise plus jitter.
    fn diagonal_shift(&self) -> f64 {
        self.noise_variance + self.jitter
    }
}

/// Fits a posterior state to all observations. See [`PosteriorState::fit`].
///
/// # Errors
///
/// Same as [`PosteriorState::fit`].
pub fn fit(
    features: &DMatrix<f64>,
    targets: &DMatrix<f64>,
    likelihood: &Likelihood,
) -> Result<PosteriorState> {
    PosteriorState::fit(features, targets, likelihood)
}

/// Extends `state` by one observation. See [`PosteriorState::update`].
///
/// # Errors
///
/// Same as [`PosteriorState::update`].
pub fn update(state: &PosteriorState, feature: &[f64], target: &[f64]) -> Result<PosteriorState> {
    state.update(feature, target)
}

/// Predictive mean and latent variance at the rows of `query`. See
/// [`PosteriorState::predict`].
///
/// The variance excludes the noise; on an empty state it is `k(x, x)`.
/// [`PosteriorState::predict_observed`] adds `σ²`.
///
/// # Examples
///
/// ```
/// use gp_posterior::kernel::Matern52;
/// use gp_posterior::mean::ZeroMean;
/// use gp_posterior::{Likelihood, PosteriorState, predict};
/// use nalgebra::DMatrix;
///
/// let likelihood = Likelihood::new(Matern52::new(1), ZeroMean, 0.25).unwrap();
/// let state = PosteriorState::empty(&likelihood, 1).unwrap();
/// let query = DMatrix::from_element(1, 1, 0.4);
///
/// let latent = predict(&state, &query).unwrap();
/// let observed = state.predict_observed(&query).unwrap();
/// assert!((latent.variance[0] - 1.0).abs() < 1e-12);
/// assert!((observed.variance[0] - 1.25).abs() < 1e-12);
/// ```
///
/// # Errors
///
/// Same as [`PosteriorState::predict`].
pub fn predict(state: &PosteriorState, query: &DMatrix<f64>) -> Result<Prediction> {
    state.predict(query)
}

fn validate(features: &DMatrix<f64>, targets: &DMatrix<f64>, likelihood: &Likelihood) -> Result<()> {
    if features.nrows() != targets.nrows() {
        return Err(Error::RowCountMismatch {
            features: features.nrows(),
            targets: targets.nrows(),
        });
    }
    if targets.ncols() == 0 {
        return Err(Error::EmptyTargets);
    }
    likelihood.check_feature_width("features", features.ncols(), features.nrows())?;
    data::check_finite("features", features)?;
    data::check_finite("targets", targets)?;
    Ok(())
}

/// `Y - m(X)`, broadcasting the mean across target columns.
fn centered_targets(
    targets: &DMatrix<f64>,
    features: &DMatrix<f64>,
    likelihood: &Likelihood,
) -> DMatrix<f64> {
    let mean = likelihood.mean_vector(features);
    DMatrix::from_fn(targets.nrows(), targets.ncols(), |i, j| {
        targets[(i, j)] - mean[i]
    })
}

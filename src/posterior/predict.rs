//! Predictive queries against a posterior state.

use nalgebra::{DMatrix, DVector};

use super::PosteriorState;
use crate::data;
use crate::error::Result;
use crate::linalg;

/// Predictive marginals at M query points.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    /// Predictive means, M × P (one column per target).
    pub mean: DMatrix<f64>,
    /// Predictive variances, length M, shared by all target columns.
    pub variance: DVector<f64>,
}

impl Prediction {
    /// Adds observation noise to the variances, turning the latent-function
    /// prediction into a prediction of a new noisy observation.
    #[must_use]
    pub fn with_noise(mut self, noise_variance: f64) -> Self {
        self.variance.add_scalar_mut(noise_variance);
        self
    }

    /// Predictive standard deviations.
    #[must_use]
    pub fn std_dev(&self) -> DVector<f64> {
        self.variance.map(f64::sqrt)
    }

    #[must_use]
    pub fn num_points(&self) -> usize {
        self.variance.len()
    }
}

impl PosteriorState {
    /// Predictive mean and variance of the latent function at each row of
    /// `query`.
    ///
    /// `mean = m(Xq) + Vᵗ pred_mat` and `variance = k(xq, xq) - ‖V[:, q]‖²`
    /// with `V = L⁻¹ K(X, Xq)`; variances are clipped at zero. On an empty
    /// state this is the latent prior `m(x)`, `k(x, x)` without noise. Use
    /// [`predict_observed`](PosteriorState::predict_observed) for the
    /// variance `k(x, x) + σ²` of a new observation.
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if the query width differs from the
    /// feature width, or `Error::NonFinite` for non-finite query values.
    pub fn predict(&self, query: &DMatrix<f64>) -> Result<Prediction> {
        self.check_query(query)?;
        let prior_mean = self.likelihood.mean_vector(query);
        let prior_var = self.likelihood.prior_variance(query);
        let m = query.nrows();
        let p = self.num_targets();

        if self.is_empty() {
            return Ok(Prediction {
                mean: DMatrix::from_fn(m, p, |i, _| prior_mean[i]),
                variance: prior_var,
            });
        }

        let v = self.whitened_cross_covariance(query)?;
        let mut mean = v.transpose() * &self.pred_mat;
        for (i, mut row) in mean.row_iter_mut().enumerate() {
            row.add_scalar_mut(prior_mean[i]);
        }
        let variance = DVector::from_fn(m, |q, _| {
            (prior_var[q] - v.column(q).norm_squared()).max(0.0)
        });

        Ok(Prediction { mean, variance })
    }

    /// Like [`predict`](PosteriorState::predict) but with the noise variance
    /// added, i.e. the predictive distribution of a new observation. On an
    /// empty state the variance is `k(x, x) + σ²`.
    ///
    /// # Errors
    ///
    /// Same as [`predict`](PosteriorState::predict).
    pub fn predict_observed(&self, query: &DMatrix<f64>) -> Result<Prediction> {
        Ok(self.predict(query)?.with_noise(self.noise_variance))
    }

    /// `V = L⁻¹ K(X, Xq)`, N × M.
    pub(crate) fn whitened_cross_covariance(&self, query: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        let k_cross = self.likelihood.cross_covariance(&self.features, query);
        linalg::forward_solve(&self.chol_fact, &k_cross)
    }

    pub(crate) fn check_query(&self, query: &DMatrix<f64>) -> Result<()> {
        self.likelihood
            .check_feature_width("query", query.ncols(), query.nrows())?;
        data::check_finite("query", query)
    }
}

//! Draws from the posterior predictive distribution.

use nalgebra::DMatrix;

use super::PosteriorState;
use crate::error::Result;
use crate::linalg;
use crate::rng_util;

impl PosteriorState {
    /// Draws `num_samples` independent samples of the latent function at
    /// each query point, ignoring correlations between points.
    ///
    /// Each returned matrix is M × P.
    ///
    /// # Errors
    ///
    /// Same as [`predict`](PosteriorState::predict).
    pub fn sample_marginals(
        &self,
        query: &DMatrix<f64>,
        num_samples: usize,
        rng: &mut fastrand::Rng,
    ) -> Result<Vec<DMatrix<f64>>> {
        let pred = self.predict(query)?;
        let std = pred.std_dev();
        Ok((0..num_samples)
            .map(|_| {
                DMatrix::from_fn(pred.mean.nrows(), pred.mean.ncols(), |i, j| {
                    pred.mean[(i, j)] + std[i] * rng_util::standard_normal(rng)
                })
            })
            .collect())
    }

    /// Draws `num_samples` samples from the joint posterior over all query
    /// points.
    ///
    /// The posterior covariance `K(Xq, Xq) - Vᵗ V` is factorized with the
    /// likelihood's jitter schedule; target columns are sampled
    /// independently. Each returned matrix is M × P.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`predict`](PosteriorState::predict), or
    /// `Error::CholeskyFailed` if the posterior covariance cannot be factored.
    pub fn sample_joint(
        &self,
        query: &DMatrix<f64>,
        num_samples: usize,
        rng: &mut fastrand::Rng,
    ) -> Result<Vec<DMatrix<f64>>> {
        let pred = self.predict(query)?;
        let mut cov = self.likelihood.covariance_matrix(query);
        if !self.is_empty() {
            let v = self.whitened_cross_covariance(query)?;
            cov -= v.transpose() * &v;
        }
        // Restore exact symmetry lost to rounding.
        let cov = (&cov + cov.transpose()) * 0.5;
        let factor = linalg::cholesky_with_jitter(&cov, self.likelihood.jitter_config())?;

        let (m, p) = pred.mean.shape();
        Ok((0..num_samples)
            .map(|_| {
                let z = DMatrix::from_fn(m, p, |_, _| rng_util::standard_normal(rng));
                &pred.mean + &factor.l * z
            })
            .collect())
    }
}

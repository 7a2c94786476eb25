//! Block Cholesky extension by one observation.
//!
//! With `L Lᵗ = A` and a new point `x*`, the extended matrix
//!
//! ```text
//! A' = [ A    b  ]      b = K(X, x*)
//!      [ bᵗ   c  ]      c = k(x*, x*) + σ²
//! ```
//!
//! factors as `L' = [[L, 0], [zᵗ, d]]` with `z = L⁻¹ b` and
//! `d = sqrt(c - zᵗz)`. The whitened residual gains one entry per target
//! column: `(y* - m(x*) - zᵗ pred_mat) / d`.

use nalgebra::DMatrix;

use super::PosteriorState;
use crate::data;
use crate::error::{Error, Result};
use crate::linalg;

impl PosteriorState {
    /// Returns a new state extended by the observation `(feature, target)`.
    ///
    /// Runs in O(N²) and leaves `self` untouched. The result matches a
    /// [`fit`](PosteriorState::fit) over all N + 1 observations up to
    /// rounding. The noise variance cannot change on this path; use a batch
    /// fit for that.
    ///
    /// # Errors
    ///
    /// - `Error::DimensionMismatch` if `feature` or `target` has the wrong length.
    /// - `Error::NonFinite` for `NaN` or infinite inputs.
    /// - `Error::NonPositiveRadicand` if the new diagonal entry would not be
    ///   positive. A batch refit over the extended data may still succeed.
    pub fn update(&self, feature: &[f64], target: &[f64]) -> Result<Self> {
        let n = self.num_observations();
        if feature.len() != self.num_features() {
            return Err(Error::DimensionMismatch {
                what: "feature row",
                expected: self.num_features(),
                got: feature.len(),
            });
        }
        if target.len() != self.num_targets() {
            return Err(Error::DimensionMismatch {
                what: "target row",
                expected: self.num_targets(),
                got: target.len(),
            });
        }
        data::check_finite_row("feature", n, feature)?;
        data::check_finite_row("target", n, target)?;

        let kernel = self.likelihood.kernel();
        let b = DMatrix::from_iterator(
            n,
            1,
            data::rows(&self.features)
                .iter()
                .map(|row| kernel.covariance(row, feature)),
        );
        let z = linalg::forward_solve(&self.chol_fact, &b)?;

        let radicand = kernel.diagonal(feature) + self.diagonal_shift() - z.norm_squared();
        if !(radicand.is_finite() && radicand > 0.0) {
            trace_debug!(n, radicand, "incremental update lost positive-definiteness");
            return Err(Error::NonPositiveRadicand { radicand, index: n });
        }
        let d = radicand.sqrt();

        let l = &self.chol_fact;
        let chol_fact = DMatrix::from_fn(n + 1, n + 1, |i, j| match (i < n, j < n) {
            (true, true) => l[(i, j)],
            (true, false) => 0.0,
            (false, true) => z[(j, 0)],
            (false, false) => d,
        });

        let offset = self.likelihood.mean().mean(feature);
        let z_col = z.column(0);
        let new_row: Vec<f64> = target
            .iter()
            .zip(self.pred_mat.column_iter())
            .map(|(y, w)| (y - offset - w.dot(&z_col)) / d)
            .collect();

        trace_debug!(n = n + 1, "extended posterior state");

        Ok(Self {
            features: data::append_row(&self.features, feature),
            targets: data::append_row(&self.targets, target),
            chol_fact,
            pred_mat: data::append_row(&self.pred_mat, &new_row),
            noise_variance: self.noise_variance,
            jitter: self.jitter,
            likelihood: self.likelihood.clone(),
        })
    }

    /// Applies [`update`](PosteriorState::update) for each row of `features`
    /// and `targets` in order.
    ///
    /// # Errors
    ///
    /// Returns `Error::RowCountMismatch` if the matrices differ in rows, or
    /// the first error raised by an individual update.
    pub fn update_many(&self, features: &DMatrix<f64>, targets: &DMatrix<f64>) -> Result<Self> {
        if features.nrows() != targets.nrows() {
            return Err(Error::RowCountMismatch {
                features: features.nrows(),
                targets: targets.nrows(),
            });
        }
        let mut state = self.clone();
        for (x, y) in data::rows(features).iter().zip(data::rows(targets).iter()) {
            state = state.update(x, y)?;
        }
        Ok(state)
    }
}

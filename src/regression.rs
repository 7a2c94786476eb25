//! A thread-safe slot holding the current posterior state of a GP model.
//!
//! [`GpRegression`] is what a scheduler keeps between trials: it owns the
//! [`Likelihood`] and the latest [`PosteriorState`]. New observations are
//! appended through the O(N²) incremental path. If that path loses
//! positive-definiteness, the slot falls back to a batch refit over the
//! extended data, whose jitter loop can still recover.
//!
//! Readers take an `Arc` snapshot of the current state; later appends
//! swap in a new state and never disturb snapshots already handed out.
//!
//! # Examples
//!
//! ```
//! use gp_posterior::kernel::Matern52;
//! use gp_posterior::mean::ZeroMean;
//! use gp_posterior::{GpRegression, Likelihood};
//! use nalgebra::DMatrix;
//!
//! let model = GpRegression::new(Likelihood::new(Matern52::new(1), ZeroMean, 0.01).unwrap());
//! model.append(&[0.0], &[0.3]).unwrap();
//! model.append(&[1.0], &[0.9]).unwrap();
//!
//! let before = model.state().unwrap();
//! model.append(&[0.5], &[0.6]).unwrap();
//!
//! assert_eq!(before.num_observations(), 2);
//! assert_eq!(model.num_observations(), 3);
//!
//! let pred = model.predict(&DMatrix::from_element(1, 1, 0.5)).unwrap();
//! assert!(pred.variance[0] < 0.1);
//! ```

use std::sync::Arc;

use nalgebra::DMatrix;
use parking_lot::RwLock;

use crate::data;
use crate::error::{Error, Result};
use crate::likelihood::Likelihood;
use crate::posterior::{PosteriorState, Prediction};

/// GP regression model with a swappable, shareable posterior state.
#[derive(Debug)]
pub struct GpRegression {
    likelihood: Likelihood,
    state: RwLock<Option<Arc<PosteriorState>>>,
}

impl GpRegression {
    /// Creates a model with no observations.
    #[must_use]
    pub fn new(likelihood: Likelihood) -> Self {
        Self {
            likelihood,
            state: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn likelihood(&self) -> &Likelihood {
        &self.likelihood
    }

    /// Snapshot of the current posterior state, if any observations were fitted.
    #[must_use]
    pub fn state(&self) -> Option<Arc<PosteriorState>> {
        self.state.read().clone()
    }

    /// Number of observations in the current state.
    #[must_use]
    pub fn num_observations(&self) -> usize {
        self.state
            .read()
            .as_ref()
            .map_or(0, |s| s.num_observations())
    }

    /// Replaces the current state with a batch fit over `features` and `targets`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`PosteriorState::fit`]; the previous state is
    /// kept on failure.
    pub fn fit(
        &self,
        features: &DMatrix<f64>,
        targets: &DMatrix<f64>,
    ) -> Result<Arc<PosteriorState>> {
        let state = Arc::new(PosteriorState::fit(features, targets, &self.likelihood)?);
        *self.state.write() = Some(Arc::clone(&state));
        trace_info!(n = state.num_observations(), "posterior refitted");
        Ok(state)
    }

    /// Appends one observation and returns the new state.
    ///
    /// Uses the incremental update; on `Error::NonPositiveRadicand` falls
    /// back to a batch fit over all observations including the new one.
    /// With no current state, starts from an empty one with
    /// `target.len()` columns.
    ///
    /// # Errors
    ///
    /// Returns validation and dimension errors of
    /// [`PosteriorState::update`], or the error of the fallback fit. The
    /// previous state is kept on failure.
    pub fn append(&self, feature: &[f64], target: &[f64]) -> Result<Arc<PosteriorState>> {
        let mut slot = self.state.write();
        let current = match slot.as_ref() {
            Some(state) => Arc::clone(state),
            None => Arc::new(PosteriorState::empty(&self.likelihood, target.len())?),
        };

        let next = match current.update(feature, target) {
            Ok(next) => next,
            Err(err) if err.is_recoverable_by_refit() => {
                trace_info!(
                    n = current.num_observations(),
                    error = %err,
                    "incremental update failed, refitting from scratch"
                );
                let features = data::append_row(current.features(), feature);
                let targets = data::append_row(current.targets(), target);
                PosteriorState::fit(&features, &targets, &self.likelihood)?
            }
            Err(err) => return Err(err),
        };

        let next = Arc::new(next);
        *slot = Some(Arc::clone(&next));
        Ok(next)
    }

    /// Predicts at the rows of `query` using the current state, or the prior
    /// when nothing was observed yet.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`PosteriorState::predict`].
    pub fn predict(&self, query: &DMatrix<f64>) -> Result<Prediction> {
        match self.state() {
            Some(state) => state.predict(query),
            None => PosteriorState::empty(&self.likelihood, 1)?.predict(query),
        }
    }

    /// Negative log marginal likelihood of the current state.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the model has no state yet.
    pub fn neg_log_likelihood(&self) -> Result<f64> {
        self.state()
            .map(|s| s.neg_log_likelihood())
            .ok_or(Error::InvalidConfig("model has no posterior state yet"))
    }

    /// Drops the current state. Outstanding snapshots stay valid.
    pub fn reset(&self) {
        *self.state.write() = None;
    }
}

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Gaussian-process posterior engine for Bayesian optimization loops.
//!
//! Fits an exact GP posterior to N observations with one O(N³) Cholesky
//! factorization, then extends it one observation at a time in O(N²)
//! through a block Cholesky update. Factorization retries with a bounded,
//! geometrically growing diagonal jitter when the covariance matrix is
//! numerically singular.
//!
//! # Getting Started
//!
//! ```
//! use gp_posterior::prelude::*;
//!
//! let likelihood = Likelihood::new(Matern52::new(1), ZeroMean, 1e-4).unwrap();
//! let x = gp_posterior::data::features_from_rows(&[vec![0.0], vec![0.5], vec![1.0]]).unwrap();
//! let y = gp_posterior::data::targets_from_values(&[0.0, 0.8, 0.2]).unwrap();
//!
//! let state = PosteriorState::fit(&x, &y, &likelihood).unwrap();
//! let state = state.update(&[0.25], &[0.5]).unwrap();
//!
//! let query = gp_posterior::data::features_from_rows(&[vec![0.75]]).unwrap();
//! let pred = state.predict(&query).unwrap();
//! println!("mean = {:.3}, var = {:.3}", pred.mean[(0, 0)], pred.variance[0]);
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`Kernel`](kernel::Kernel) | Covariance function: [`Matern52`](kernel::Matern52), [`SquaredExponential`](kernel::SquaredExponential). |
//! | [`MeanFunction`](mean::MeanFunction) | Prior mean: [`ZeroMean`](mean::ZeroMean), [`ConstantMean`](mean::ConstantMean). |
//! | [`Likelihood`] | Kernel, mean, noise variance, and [`JitterConfig`]. |
//! | [`PosteriorState`] | Immutable Cholesky factor and whitened targets; [`fit`], [`update`], [`predict`]. |
//! | [`GpRegression`] | Thread-safe slot holding the latest state, with refit fallback on append. |
//! | [`MarginalLikelihood`] | Negative log marginal likelihood over encoded hyperparameters, for external optimizers. |
//!
//! # Errors
//!
//! Every fallible operation returns [`Error`]; [`Error::kind`] groups the
//! variants into [`ErrorKind::Validation`], [`ErrorKind::NumericalInstability`],
//! and [`ErrorKind::Dimension`].
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `serde` | `Serialize`/`Deserialize` on kernels, means, and configuration types | off |
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) for fits, jitter retries, and refits | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

pub mod data;
mod error;
pub mod kernel;
mod likelihood;
mod linalg;
pub mod mean;
pub mod objective;
pub mod posterior;
pub mod regression;
mod rng_util;

pub use error::{Error, ErrorKind, Result};
pub use likelihood::{Likelihood, LikelihoodBuilder, NOISE_VARIANCE_LOWER_BOUND};
pub use linalg::{JitterConfig, MAX_JITTER_RETRIES};
pub use objective::{FiniteDifference, MarginalLikelihood};
pub use posterior::{PosteriorState, Prediction, fit, predict, update};
pub use regression::GpRegression;

/// Convenient wildcard import for the most common types.
///
/// ```
/// use gp_posterior::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::kernel::{Kernel, Matern52, SquaredExponential};
    pub use crate::likelihood::{Likelihood, LikelihoodBuilder};
    pub use crate::linalg::JitterConfig;
    pub use crate::mean::{ConstantMean, MeanFunction, ZeroMean};
    pub use crate::objective::{FiniteDifference, MarginalLikelihood};
    pub use crate::posterior::{PosteriorState, Prediction};
    pub use crate::regression::GpRegression;
}

#![allow(
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]

mod batch;
mod objective;
mod regression;

use gp_posterior::kernel::Matern52;
use gp_posterior::mean::ZeroMean;
use gp_posterior::Likelihood;
use nalgebra::DMatrix;

/// Matérn 5/2 likelihood with unit lengthscale and variance.
fn matern_likelihood(dimension: usize, noise_variance: f64) -> Likelihood {
    Likelihood::new(Matern52::new(dimension), ZeroMean, noise_variance).unwrap()
}

/// `n` random points in `[0, 1]^d` with targets from a smooth function.
fn random_data(rng: &mut fastrand::Rng, n: usize, d: usize) -> (DMatrix<f64>, DMatrix<f64>) {
    let x = DMatrix::from_fn(n, d, |_, _| rng.f64());
    let y = DMatrix::from_fn(n, 1, |i, _| {
        let s: f64 = x.row(i).iter().sum();
        (3.0 * s).sin() + 0.1 * (rng.f64() - 0.5)
    });
    (x, y)
}

/// Largest entry-wise absolute difference.
fn max_abs_diff(a: &DMatrix<f64>, b: &DMatrix<f64>) -> f64 {
    assert_eq!(a.shape(), b.shape());
    if a.is_empty() {
        return 0.0;
    }
    (a - b).abs().max()
}

use gp_posterior::kernel::{Matern52, SquaredExponential};
use gp_posterior::mean::{ConstantMean, ZeroMean};
use gp_posterior::{Error, ErrorKind, JitterConfig, Likelihood, PosteriorState, data};
use nalgebra::DMatrix;

use super::{matern_likelihood, random_data};

fn assert_valid_factor(state: &PosteriorState, likelihood: &Likelihood) {
    let l = state.chol_fact();
    let n = state.num_observations();
    assert_eq!(l.shape(), (n, n));

    for i in 0..n {
        assert!(l[(i, i)] > 0.0, "diagonal {i} is {}", l[(i, i)]);
        for j in (i + 1)..n {
            assert!(l[(i, j)].abs() < f64::EPSILON, "upper entry ({i}, {j})");
        }
    }

    if n > 0 {
        let a = likelihood.regularized_covariance(state.features());
        let rel = (l * l.transpose() - &a).abs().max() / a.abs().max();
        assert!(rel < 1e-6, "relative reconstruction error {rel}");
    }
}

#[test]
fn test_factor_reconstructs_covariance_for_random_data() {
    for seed in [1, 7, 42] {
        let mut rng = fastrand::Rng::with_seed(seed);
        for &(n, d) in &[(1, 1), (5, 2), (20, 3), (40, 1)] {
            let (x, y) = random_data(&mut rng, n, d);
            let likelihood = matern_likelihood(d, 0.01);
            let state = PosteriorState::fit(&x, &y, &likelihood).unwrap();
            assert_valid_factor(&state, &likelihood);
            assert_eq!(state.pred_mat().shape(), (n, 1));
        }
    }
}

#[test]
fn test_factor_with_small_noise_and_smooth_kernel() {
    let mut rng = fastrand::Rng::with_seed(3);
    let (x, y) = random_data(&mut rng, 30, 1);
    let likelihood = Likelihood::new(
        SquaredExponential::isotropic(1, 0.5, 1.0).unwrap(),
        ZeroMean,
        1e-6,
    )
    .unwrap();
    let state = PosteriorState::fit(&x, &y, &likelihood).unwrap();
    assert_valid_factor(&state, &likelihood);
}

#[test]
fn test_three_point_scenario() {
    let f = |x: f64| (2.0 * x).sin();
    let x = data::features_from_rows(&[vec![0.0], vec![0.5], vec![1.0]]).unwrap();
    let noise = [0.03, -0.02, 0.01];
    let y = DMatrix::from_fn(3, 1, |i, _| f(x[(i, 0)]) + noise[i]);

    let likelihood = Likelihood::new(
        Matern52::isotropic(1, 1.0, 1.0).unwrap(),
        ZeroMean,
        0.01,
    )
    .unwrap();
    let state = gp_posterior::fit(&x, &y, &likelihood).unwrap();

    assert_eq!(state.chol_fact().shape(), (3, 3));
    assert_valid_factor(&state, &likelihood);
    assert_eq!(state.pred_mat().len(), 3);

    let query = data::features_from_rows(&[vec![0.5], vec![5.0]]).unwrap();
    let pred = gp_posterior::predict(&state, &query).unwrap();
    assert!(
        (pred.mean[(0, 0)] - y[(1, 0)]).abs() < 0.1,
        "mean at 0.5 is {}, target {}",
        pred.mean[(0, 0)],
        y[(1, 0)]
    );
    assert!(pred.variance[0] < pred.variance[1]);
}

#[test]
fn test_multi_target_columns_share_factor() {
    let x = data::features_from_rows(&[vec![0.0], vec![0.4], vec![0.9]]).unwrap();
    let y = data::targets_from_rows(&[vec![1.0, 0.0], vec![0.5, 0.2], vec![0.1, 0.7]]).unwrap();
    let likelihood = matern_likelihood(1, 0.01);
    let both = PosteriorState::fit(&x, &y, &likelihood).unwrap();
    let first = PosteriorState::fit(&x, &y.columns(0, 1).into_owned(), &likelihood).unwrap();
    let second = PosteriorState::fit(&x, &y.columns(1, 1).into_owned(), &likelihood).unwrap();

    assert_eq!(both.chol_fact(), first.chol_fact());
    assert_eq!(both.pred_mat().column(0), first.pred_mat().column(0));
    assert_eq!(both.pred_mat().column(1), second.pred_mat().column(0));

    let summed = first.neg_log_likelihood() + second.neg_log_likelihood();
    assert!((both.neg_log_likelihood() - summed).abs() < 1e-10);
}

#[test]
fn test_constant_mean_is_subtracted() {
    let x = data::features_from_rows(&[vec![0.0], vec![1.0]]).unwrap();
    let y = data::targets_from_values(&[5.0, 5.0]).unwrap();
    let likelihood = Likelihood::new(Matern52::new(1), ConstantMean::new(5.0).unwrap(), 0.01).unwrap();
    let state = PosteriorState::fit(&x, &y, &likelihood).unwrap();
    assert!(state.pred_mat().abs().max() < 1e-12);
    assert!(state.weights().unwrap().abs().max() < 1e-12);
}

#[test]
fn test_exact_duplicates_recovered_by_jitter() {
    let x = data::features_from_rows(&[vec![0.3], vec![0.3], vec![0.3]]).unwrap();
    let y = data::targets_from_values(&[1.0, 1.1, 0.9]).unwrap();
    let likelihood = Likelihood::builder(Matern52::new(1))
        .noise_variance(gp_posterior::NOISE_VARIANCE_LOWER_BOUND)
        .build()
        .unwrap();
    let state = PosteriorState::fit(&x, &y, &likelihood).unwrap();
    assert!(state.chol_fact().diagonal().iter().all(|d| *d > 0.0));
    assert!(state.jitter() >= 0.0);
}

#[test]
fn test_rank_deficient_matrix_without_jitter_fails() {
    // With variance 1e8 the noise floor vanishes in rounding, so identical
    // rows leave an exactly singular matrix.
    let x = data::features_from_rows(&vec![vec![0.0]; 5]).unwrap();
    let y = data::targets_from_values(&[0.0; 5]).unwrap();
    let likelihood = Likelihood::builder(SquaredExponential::isotropic(1, 1.0, 1e8).unwrap())
        .noise_variance(gp_posterior::NOISE_VARIANCE_LOWER_BOUND)
        .jitter(JitterConfig::none())
        .build()
        .unwrap();

    let err = PosteriorState::fit(&x, &y, &likelihood).unwrap_err();
    assert!(matches!(
        err,
        Error::CholeskyFailed {
            size: 5,
            attempts: 1,
            ..
        }
    ));
    assert_eq!(err.kind(), ErrorKind::NumericalInstability);
    assert!(!err.is_recoverable_by_refit());
}

#[test]
fn test_validation_errors_are_reported_before_computation() {
    let likelihood = matern_likelihood(2, 0.01);
    let x = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 1.0, f64::INFINITY]);
    let y = DMatrix::from_column_slice(2, 1, &[0.0, 1.0]);
    let err = PosteriorState::fit(&x, &y, &likelihood).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(matches!(err, Error::NonFinite { name: "features", row: 1, col: 1, .. }));

    let x = DMatrix::zeros(3, 2);
    let err = PosteriorState::fit(&x, &y, &likelihood).unwrap_err();
    assert!(matches!(err, Error::RowCountMismatch { features: 3, targets: 2 }));

    let x = DMatrix::zeros(2, 3);
    let err = PosteriorState::fit(&x, &y, &likelihood).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Dimension);
}

#[test]
fn test_noise_below_floor_rejected() {
    for noise in [0.0, -1.0, 1e-12, f64::NAN] {
        let err = Likelihood::new(Matern52::new(1), ZeroMean, noise).unwrap_err();
        assert!(matches!(err, Error::NoiseVarianceBelowFloor { .. }));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}

#[test]
fn test_empty_fit() {
    let likelihood = matern_likelihood(1, 0.01);
    let x = data::features_from_rows(&[]).unwrap();
    let y = DMatrix::zeros(0, 1);
    let state = PosteriorState::fit(&x, &y, &likelihood).unwrap();
    assert!(state.is_empty());
    assert_eq!(state.num_features(), 1);
    assert_valid_factor(&state, &likelihood);
}

use std::sync::Arc;

use gp_posterior::kernel::{Matern52, SquaredExponential};
use gp_posterior::mean::ZeroMean;
use gp_posterior::{ErrorKind, GpRegression, JitterConfig, Likelihood, PosteriorState};
use nalgebra::DMatrix;

use super::{matern_likelihood, max_abs_diff, random_data};

#[test]
fn test_snapshots_survive_later_appends() {
    let model = GpRegression::new(matern_likelihood(1, 0.01));
    model.append(&[0.0], &[0.0]).unwrap();
    model.append(&[1.0], &[1.0]).unwrap();

    let snapshot = model.state().unwrap();
    let query = DMatrix::from_element(1, 1, 0.5);
    let before = snapshot.predict(&query).unwrap();

    model.append(&[0.5], &[2.0]).unwrap();
    model.append(&[0.6], &[2.1]).unwrap();

    let after = snapshot.predict(&query).unwrap();
    assert_eq!(before, after);
    assert_eq!(snapshot.num_observations(), 2);
    assert_eq!(model.num_observations(), 4);
    assert!(!Arc::ptr_eq(&snapshot, &model.state().unwrap()));
}

#[test]
fn test_appends_match_batch_fit() {
    let mut rng = fastrand::Rng::with_seed(21);
    let (x, y) = random_data(&mut rng, 15, 2);
    let likelihood = matern_likelihood(2, 0.01);

    let model = GpRegression::new(likelihood.clone());
    for i in 0..x.nrows() {
        let row_x: Vec<f64> = x.row(i).iter().copied().collect();
        model.append(&row_x, &[y[(i, 0)]]).unwrap();
    }
    let state = model.state().unwrap();
    let batch = PosteriorState::fit(&x, &y, &likelihood).unwrap();
    assert!(max_abs_diff(state.chol_fact(), batch.chol_fact()) < 1e-2);
    assert!(max_abs_diff(state.pred_mat(), batch.pred_mat()) < 1e-2);
    assert!((model.neg_log_likelihood().unwrap() - batch.neg_log_likelihood()).abs() < 1e-6);
}

#[test]
fn test_append_falls_back_to_refit_when_update_breaks_down() {
    // Huge signal variance makes the noise floor vanish in rounding, so a
    // duplicate point leaves a zero radicand; the batch refit recovers
    // through jitter.
    let likelihood = Likelihood::builder(SquaredExponential::isotropic(1, 1.0, 1e8).unwrap())
        .noise_variance(gp_posterior::NOISE_VARIANCE_LOWER_BOUND)
        .build()
        .unwrap();
    let model = GpRegression::new(likelihood);
    model.append(&[0.0], &[1.0]).unwrap();

    let direct = model.state().unwrap().update(&[0.0], &[1.0]);
    let err = direct.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NumericalInstability);
    assert!(err.is_recoverable_by_refit());

    let state = model.append(&[0.0], &[1.0]).unwrap();
    assert_eq!(state.num_observations(), 2);
    assert!(state.jitter() > 0.0);
    assert!(state.chol_fact().diagonal().iter().all(|d| *d > 0.0));
}

#[test]
fn test_failed_refit_keeps_previous_state() {
    let likelihood = Likelihood::builder(SquaredExponential::isotropic(1, 1.0, 1e8).unwrap())
        .noise_variance(gp_posterior::NOISE_VARIANCE_LOWER_BOUND)
        .jitter(JitterConfig::none())
        .build()
        .unwrap();
    let model = GpRegression::new(likelihood);
    let first = model.append(&[0.0], &[1.0]).unwrap();

    let err = model.append(&[0.0], &[1.0]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NumericalInstability);
    assert!(Arc::ptr_eq(&first, &model.state().unwrap()));
}

#[test]
fn test_concurrent_readers_see_consistent_states() {
    let model = GpRegression::new(Likelihood::new(Matern52::new(1), ZeroMean, 0.01).unwrap());
    let query = DMatrix::from_element(1, 1, 0.5);

    std::thread::scope(|s| {
        s.spawn(|| {
            for i in 0..30 {
                let x = f64::from(i) / 30.0;
                model.append(&[x], &[x.sin()]).unwrap();
            }
        });
        for _ in 0..3 {
            s.spawn(|| {
                for _ in 0..30 {
                    if let Some(state) = model.state() {
                        let n = state.num_observations();
                        assert_eq!(state.chol_fact().shape(), (n, n));
                        assert_eq!(state.pred_mat().nrows(), n);
                        assert!(state.predict(&query).unwrap().variance[0] >= 0.0);
                    }
                }
            });
        }
    });

    assert_eq!(model.num_observations(), 30);
}

#[test]
fn test_fit_replaces_state_and_reset_clears_it() {
    let model = GpRegression::new(matern_likelihood(1, 0.01));
    model.append(&[0.0], &[1.0]).unwrap();

    let x = DMatrix::from_column_slice(3, 1, &[0.1, 0.2, 0.3]);
    let y = DMatrix::from_column_slice(3, 1, &[1.0, 2.0, 3.0]);
    model.fit(&x, &y).unwrap();
    assert_eq!(model.num_observations(), 3);
    assert_eq!(model.state().unwrap().features(), &x);

    model.reset();
    assert_eq!(model.num_observations(), 0);
    assert!(model.state().is_none());
    assert_eq!(model.likelihood().dimension(), 1);
}

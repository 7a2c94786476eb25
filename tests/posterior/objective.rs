use gp_posterior::kernel::{Kernel, Matern52, SquaredExponential};
use gp_posterior::mean::{ConstantMean, MeanFunction, ZeroMean};
use gp_posterior::{Error, FiniteDifference, MarginalLikelihood, PosteriorState};

use super::random_data;

#[test]
fn test_parameter_layout() {
    let mut rng = fastrand::Rng::with_seed(1);
    let (x, y) = random_data(&mut rng, 6, 3);
    let kernel = Matern52::ard(vec![0.5, 1.0, 2.0], 1.3).unwrap();
    let mean = ConstantMean::new(0.25).unwrap();
    let objective = MarginalLikelihood::new(kernel.clone(), mean, 0.01, x, y).unwrap();

    // 3 lengthscales + variance, constant, noise.
    assert_eq!(objective.num_parameters(), 6);
    let theta = objective.initial_point();
    assert_eq!(&theta[..4], kernel.hyperparameters().as_slice());
    assert_eq!(theta[4], mean.hyperparameters()[0]);

    let likelihood = objective.likelihood_at(&theta).unwrap();
    assert!((likelihood.noise_variance() - 0.01).abs() < 1e-12);
}

#[test]
fn test_gradient_descent_improves_fit() {
    let mut rng = fastrand::Rng::with_seed(12);
    let (x, y) = random_data(&mut rng, 15, 1);
    let objective = MarginalLikelihood::new(
        SquaredExponential::isotropic(1, 3.0, 0.2).unwrap(),
        ZeroMean,
        0.5,
        x.clone(),
        y.clone(),
    )
    .unwrap()
    .with_finite_difference(FiniteDifference::new(1e-5).unwrap());

    let mut theta = objective.initial_point();
    let (start, _) = objective.value_and_gradient(&theta).unwrap();
    let mut current = start;
    for _ in 0..50 {
        let (value, gradient) = objective.value_and_gradient(&theta).unwrap();
        let norm = gradient.iter().map(|g| g * g).sum::<f64>().sqrt();
        if norm < 1e-8 {
            break;
        }
        // Backtracking line search along the normalized gradient.
        let mut step = 0.5;
        loop {
            let candidate: Vec<f64> = theta
                .iter()
                .zip(&gradient)
                .map(|(t, g)| t - step * g / norm)
                .collect();
            let next = objective.value(&candidate).unwrap();
            if next < value {
                theta = candidate;
                current = next;
                break;
            }
            step *= 0.5;
            if step < 1e-6 {
                break;
            }
        }
    }
    assert!(current < start - 1.0, "start {start}, end {current}");

    // The optimum reproduces through a regular batch fit.
    let likelihood = objective.likelihood_at(&theta).unwrap();
    let state = PosteriorState::fit(&x, &y, &likelihood).unwrap();
    assert!((state.neg_log_likelihood() - current).abs() < 1e-9);
}

#[test]
fn test_invalid_inputs_rejected_up_front() {
    let mut rng = fastrand::Rng::with_seed(2);
    let (x, mut y) = random_data(&mut rng, 4, 1);

    assert!(matches!(
        MarginalLikelihood::new(Matern52::new(1), ZeroMean, 1e-12, x.clone(), y.clone()),
        Err(Error::NoiseVarianceBelowFloor { .. })
    ));
    assert!(matches!(
        MarginalLikelihood::new(Matern52::new(2), ZeroMean, 0.01, x.clone(), y.clone()),
        Err(Error::DimensionMismatch { .. })
    ));
    y[(2, 0)] = f64::NAN;
    assert!(matches!(
        MarginalLikelihood::new(Matern52::new(1), ZeroMean, 0.01, x, y),
        Err(Error::NonFinite { .. })
    ));
}

#[test]
fn test_objective_is_shareable_across_threads() {
    let mut rng = fastrand::Rng::with_seed(3);
    let (x, y) = random_data(&mut rng, 8, 1);
    let objective = MarginalLikelihood::new(Matern52::new(1), ZeroMean, 0.01, x, y).unwrap();
    let theta = objective.initial_point();
    let expected = objective.value(&theta).unwrap();

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| objective.value(&theta).unwrap()))
            .collect();
        for h in handles {
            assert!((h.join().unwrap() - expected).abs() < f64::EPSILON);
        }
    });
}

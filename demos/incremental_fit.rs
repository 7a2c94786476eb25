//! Incremental posterior updates inside a tiny Bayesian-optimization loop.
//!
//! Each round scores random candidates with a lower confidence bound,
//! evaluates the best one, and appends it to the model in O(N²). At the end
//! the kernel hyperparameters are tuned on the collected data by gradient
//! descent on the marginal likelihood, and the tuned model is refitted.
//!
//! Run with: `cargo run --example incremental_fit`

use gp_posterior::objective::MarginalLikelihood;
use gp_posterior::prelude::*;
use nalgebra::DMatrix;

fn objective(x: f64) -> f64 {
    (3.0 * x).sin() + 0.3 * (x - 0.6).powi(2)
}

fn main() -> gp_posterior::Result<()> {
    let kernel = Matern52::isotropic(1, 0.5, 1.0)?;
    let model = GpRegression::new(Likelihood::new(kernel.clone(), ZeroMean, 1e-4)?);
    let mut rng = fastrand::Rng::with_seed(7);

    // Seed the model with two observations.
    for x in [-1.0, 2.0] {
        model.append(&[x], &[objective(x)])?;
    }

    for round in 0..12 {
        let candidates = DMatrix::from_fn(256, 1, |_, _| rng.f64() * 3.0 - 1.0);
        let pred = model.predict(&candidates)?;
        let std = pred.std_dev();
        let (best, _) = (0..candidates.nrows())
            .map(|i| (i, pred.mean[(i, 0)] - 2.0 * std[i]))
            .fold((0, f64::INFINITY), |acc, cur| if cur.1 < acc.1 { cur } else { acc });

        let x = candidates[(best, 0)];
        let y = objective(x);
        let state = model.append(&[x], &[y])?;
        println!(
            "Round {:2}: x = {x:+.4}, f(x) = {y:+.4}, N = {}, NLL = {:.3}",
            round + 1,
            state.num_observations(),
            state.neg_log_likelihood(),
        );
    }

    let state = model.state().ok_or(Error::InvalidConfig("no observations"))?;
    let tuning = MarginalLikelihood::new(
        kernel,
        ZeroMean,
        1e-4,
        state.features().clone(),
        state.targets().clone(),
    )?;

    let mut theta = tuning.initial_point();
    let mut value = tuning.value(&theta)?;
    for _ in 0..30 {
        let (_, gradient) = tuning.value_and_gradient(&theta)?;
        let norm = gradient.iter().map(|g| g * g).sum::<f64>().sqrt();
        if norm < 1e-6 {
            break;
        }
        let candidate: Vec<f64> = theta
            .iter()
            .zip(&gradient)
            .map(|(t, g)| t - 0.2 * g / norm)
            .collect();
        match tuning.value(&candidate) {
            Ok(next) if next < value => {
                theta = candidate;
                value = next;
            }
            _ => break,
        }
    }
    println!("Tuned NLL = {value:.3}");

    let tuned = GpRegression::new(tuning.likelihood_at(&theta)?);
    tuned.fit(state.features(), state.targets())?;
    let query = DMatrix::from_column_slice(3, 1, &[-0.5, 0.5, 1.5]);
    let pred = tuned.predict(&query)?;
    for i in 0..query.nrows() {
        println!(
            "f({:+.2}) ~ {:+.4} +/- {:.4} (true {:+.4})",
            query[(i, 0)],
            pred.mean[(i, 0)],
            pred.variance[i].sqrt(),
            objective(query[(i, 0)]),
        );
    }

    Ok(())
}

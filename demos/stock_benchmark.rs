//! Benchmark driver comparing the bagged forest against the closed-form
//! polynomial baseline on a tabular regression task.
//!
//! The layout mirrors the classic stock-price lab setup: split the table
//! into train/test, sweep the ensemble size, time fit + predict and report
//! explained variance, mean absolute error and mean squared error next to a
//! plain least-squares reference fit.

use std::time::Instant;

use bosque::{PolynomialRegression, RandomForestRegressor};
use linfa::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() {
    let mut rng = StdRng::seed_from_u64(42);
    let (train, test) = linfa_datasets::diabetes()
        .shuffle(&mut rng)
        .split_with_ratio(0.7);

    println!(
        "{} training samples, {} test samples, {} features",
        train.nsamples(),
        test.nsamples(),
        train.records().ncols()
    );

    println!("\n{:>8} {:>10} {:>12} {:>10} {:>12}", "trees", "time", "expl. var", "mae", "mse");
    for n_trees in [2, 5, 10, 20, 50] {
        let begin = Instant::now();

        let forest = RandomForestRegressor::params()
            .n_trees(n_trees)
            .max_depth(Some(5))
            .sample_ratio(0.5)
            .seed(42)
            .fit(&train)
            .expect("fitting the forest failed");
        let prediction = forest.predict(test.records());

        let elapsed = begin.elapsed();

        println!(
            "{:>8} {:>9.2?} {:>12.4} {:>10.2} {:>12.2}",
            n_trees,
            elapsed,
            prediction.explained_variance(&test).unwrap(),
            prediction.mean_absolute_error(&test).unwrap(),
            prediction.mean_squared_error(&test).unwrap(),
        );
    }

    println!("\n{:>8} {:>10} {:>12} {:>10} {:>12}", "degree", "time", "expl. var", "mae", "mse");
    for degree in [1, 2] {
        let begin = Instant::now();

        let model = PolynomialRegression::new(degree)
            .fit(&train)
            .expect("fitting the polynomial model failed");
        let prediction = model.predict(test.records());

        let elapsed = begin.elapsed();

        println!(
            "{:>8} {:>9.2?} {:>12.4} {:>10.2} {:>12.2}",
            degree,
            elapsed,
            prediction.explained_variance(&test).unwrap(),
            prediction.mean_absolute_error(&test).unwrap(),
            prediction.mean_squared_error(&test).unwrap(),
        );
    }
}

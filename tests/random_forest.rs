use bosque::{PolynomialRegression, RandomForestRegressor};
use linfa::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn diabetes_forest_explains_training_variance() {
    // reproducible split
    let mut rng = StdRng::seed_from_u64(42);
    let (train, valid) = linfa_datasets::diabetes()
        .shuffle(&mut rng)
        .split_with_ratio(0.8);

    let model = RandomForestRegressor::params()
        .n_trees(30)
        .max_depth(Some(6))
        .sample_ratio(0.7)
        .seed(42)
        .fit(&train)
        .expect("Training failed");

    let train_pred = model.predict(train.records());
    let train_r2 = train_pred.r2(&train).expect("Failed to compute r2");
    assert!(
        train_r2 > 0.5,
        "Expected the forest to fit the training set, got r2 = {:.3}",
        train_r2
    );

    // the validation fit is rough on so few trees but must beat the mean
    let valid_pred = model.predict(valid.records());
    let valid_r2 = valid_pred.r2(&valid).expect("Failed to compute r2");
    assert!(
        valid_r2 > 0.0,
        "Expected positive validation r2, got {:.3}",
        valid_r2
    );
}

#[test]
fn diabetes_forest_is_reproducible() {
    let dataset = linfa_datasets::diabetes();

    let params = RandomForestRegressor::params()
        .n_trees(10)
        .max_depth(Some(4))
        .sample_ratio(0.5)
        .seed(1234);

    let first = params.fit(&dataset).expect("Training failed");
    let second = params.fit(&dataset).expect("Training failed");

    assert_eq!(
        first.predict(dataset.records()),
        second.predict(dataset.records())
    );
}

#[test]
fn diabetes_polynomial_baseline() {
    let dataset = linfa_datasets::diabetes();

    // degree one is plain least squares; on diabetes it explains roughly
    // half of the variance in-sample
    let model = PolynomialRegression::new(1)
        .fit(&dataset)
        .expect("Training failed");

    let pred = model.predict(dataset.records());
    let r2 = pred.r2(&dataset).expect("Failed to compute r2");
    assert!(r2 > 0.4, "Expected r2 > 0.4 for least squares, got {:.3}", r2);
}

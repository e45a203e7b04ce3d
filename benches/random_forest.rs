use bosque::RandomForestRegressor;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use linfa::prelude::*;
use ndarray::{Array, Array1, Array2, Ix1};
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::SmallRng;

/// A mildly non-linear regression surface over four features
fn generate_dataset(nsamples: usize, rng: &mut SmallRng) -> Dataset<f64, f64, Ix1> {
    let records: Array2<f64> = Array::random_using((nsamples, 4), Uniform::new(-3., 3.), rng);
    let targets: Array1<f64> = records
        .rows()
        .into_iter()
        .map(|row| 2. * row[0] + row[1] * row[1] - row[2] * row[3])
        .collect();

    Dataset::new(records, targets)
}

fn random_forest_bench(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(42);

    let training_set_sizes = &[100, 500, 2000];

    let params = RandomForestRegressor::params()
        .n_trees(10)
        .max_depth(Some(5))
        .sample_ratio(0.5)
        .seed(42);

    let mut group = c.benchmark_group("random_forest");
    group.sample_size(20);

    for n in training_set_sizes.iter() {
        let dataset = generate_dataset(*n, &mut rng);

        group.bench_with_input(BenchmarkId::from_parameter(n), &dataset, |b, d| {
            b.iter(|| params.fit(d))
        });
    }

    group.finish();
}

criterion_group!(benches, random_forest_bench);
criterion_main!(benches);

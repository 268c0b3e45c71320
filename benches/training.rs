use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ensemble_diagnosis::ensemble::Ensemble;
use ensemble_diagnosis::training::{ModelBank, ModelBankConfig};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn create_classification_data(n_rows: usize, n_features: usize) -> (Array2<f64>, Array1<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    let y = Array1::from_iter((0..n_rows).map(|i| if i % 5 < 2 { 1.0 } else { 0.0 }));
    let x = Array2::from_shape_fn((n_rows, n_features), |(i, _)| {
        let shift = if y[i] == 1.0 { 1.0 } else { -1.0 };
        shift + rng.gen::<f64>() * 2.0 - 1.0
    });

    (x, y)
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10); // Fewer samples for training benchmarks

    let config = ModelBankConfig::new()
        .with_forest_n_estimators(50)
        .with_boosting_n_estimators(50);

    for n_rows in [200, 455].iter() {
        let (x, y) = create_classification_data(*n_rows, 30);

        for parallel in [false, true] {
            let label = if parallel { "bank_parallel" } else { "bank_sequential" };
            group.bench_with_input(BenchmarkId::new(label, n_rows), &(&x, &y), |b, (x, y)| {
                b.iter(|| ModelBank::train(&config, black_box(x), black_box(y), parallel).unwrap())
            });
        }
    }

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("prediction");

    let (x, y) = create_classification_data(455, 30);
    let config = ModelBankConfig::new()
        .with_forest_n_estimators(50)
        .with_boosting_n_estimators(50);
    let bank = ModelBank::train(&config, &x, &y, true).unwrap();
    let ensemble = Ensemble::soft(&bank).unwrap();

    for n_rows in [1, 114, 1000].iter() {
        let (test_x, _) = create_classification_data(*n_rows, 30);

        group.bench_with_input(
            BenchmarkId::new("ensemble_proba", n_rows),
            &test_x,
            |b, x| b.iter(|| ensemble.predict_proba(black_box(x)).unwrap()),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_training, bench_prediction);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use movierec::algorithms::initializer::InitializationMethod;
use movierec::config::TrainingConfig;
use movierec::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn synthetic_ratings(users: u32, items: u32, density: f64) -> Vec<RawRating<u32>> {
    let mut rng = StdRng::seed_from_u64(11);
    let mut ratings = Vec::new();
    for user in 0..users {
        for item in 0..items {
            if rng.gen_bool(density) {
                ratings.push(RawRating::new(user, item, rng.gen_range(1..=10) as f32 / 2.0));
            }
        }
    }
    ratings
}

fn config(solver: Solver) -> TrainingConfig {
    TrainingConfig {
        rank: 32,
        iterations: 5,
        learning_rate: 0.01,
        solver,
        seed: Some(1),
        ..TrainingConfig::default()
    }
}

fn benchmark_training(c: &mut Criterion) {
    let raw = synthetic_ratings(300, 200, 0.1);
    let encoder = IdEncoder::fit(&raw);
    let dataset = RatingDataset::encode(&encoder, &raw).unwrap();

    for solver in [Solver::Als, Solver::Sgd] {
        let trainer = Trainer::new(config(solver)).unwrap();
        c.bench_function(&format!("train_{:?}", solver).to_lowercase(), |b| {
            b.iter(|| black_box(trainer.fit(encoder.clone(), &dataset).unwrap()));
        });
    }
}

fn benchmark_scoring(c: &mut Criterion) {
    let raw = synthetic_ratings(300, 200, 0.1);
    let encoder = IdEncoder::fit(&raw);
    let dataset = RatingDataset::encode(&encoder, &raw).unwrap();
    let model = Trainer::new(config(Solver::Als)).unwrap().fit(encoder, &dataset).unwrap();

    c.bench_function("score_pair", |b| {
        b.iter(|| black_box(model.score(black_box(10), black_box(20)).unwrap()));
    });

    c.bench_function("recommend_by_key", |b| {
        let user = *model.encoder().user_key(0).unwrap();
        let item = *model.encoder().item_key(0).unwrap();
        b.iter(|| black_box(recommend(&model, &user, &item, 3.5).unwrap()));
    });

    c.bench_function("evaluate", |b| {
        b.iter(|| black_box(evaluate(&model, &dataset).unwrap()));
    });
}

fn benchmark_initialization(c: &mut Criterion) {
    c.bench_function("initialize_factor_matrix", |b| {
        let mut rng = StdRng::seed_from_u64(3);
        let method = InitializationMethod::default();
        b.iter(|| black_box(method.initialize_matrix(&mut rng, 1000, 100)));
    });
}

criterion_group!(benches, benchmark_training, benchmark_scoring, benchmark_initialization);
criterion_main!(benches);

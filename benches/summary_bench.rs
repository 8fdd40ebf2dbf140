use betaviz::analysis::{
    control_contrasts, pairwise_contrasts, ConditionDraws, DrawSummarizer, Quantity,
};
use criterion::{criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

const DRAWS: usize = 4000;

fn draws(rng: &mut StdRng, offset: f64) -> Vec<f64> {
    (0..DRAWS).map(|_| offset + rng.random::<f64>()).collect()
}

fn bench_summarize(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let values = draws(&mut rng, 0.0);
    let summarizer = DrawSummarizer::new(&[0.5, 0.8, 0.95]).unwrap();

    c.bench_function("summarize_4000_draws", |b| {
        b.iter(|| summarizer.summarize(black_box(&values)).unwrap())
    });
}

fn bench_contrasts(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(11);
    let series = ["bars", "hops", "intervals", "none"]
        .iter()
        .enumerate()
        .map(|(i, level)| (level.to_string(), draws(&mut rng, i as f64 * 0.1)))
        .collect();
    let condition_draws = ConditionDraws::new(Quantity::Mean, series).unwrap();
    let summarizer = DrawSummarizer::new(&[0.5, 0.8, 0.95]).unwrap();

    let mut group = c.benchmark_group("contrasts");
    group.bench_function("control", |b| {
        b.iter(|| control_contrasts(black_box(&condition_draws), "none", &summarizer).unwrap())
    });
    group.bench_function("pairwise", |b| {
        b.iter(|| pairwise_contrasts(black_box(&condition_draws), &summarizer).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_summarize, bench_contrasts);
criterion_main!(benches);

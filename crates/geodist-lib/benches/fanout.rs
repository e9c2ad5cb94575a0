use criterion::{criterion_group, criterion_main, Criterion};
use geodist_lib::{
    great_circle_distance, Concurrency, Coordinate, FanOut, FanOutOptions, ResultOrder,
};
use std::hint::black_box;

const SOURCE: Coordinate = Coordinate::new(55.545454, 12.5465465);

fn candidates(n: usize) -> Vec<Coordinate> {
    (0..n)
        .map(|i| {
            let step = i as f64;
            Coordinate::new(50.0 + (step * 0.11) % 15.0, 5.0 + (step * 0.29) % 25.0)
        })
        .collect()
}

fn benchmark_distance(c: &mut Criterion) {
    let candidate = Coordinate::new(55.6, 12.6);
    c.bench_function("great_circle_distance", |b| {
        b.iter(|| great_circle_distance(black_box(SOURCE), black_box(candidate)))
    });
}

fn benchmark_fan_out(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("tokio runtime");
    let candidates = candidates(10_000);

    let engines = [
        ("fan_out_unbounded_10k", FanOut::new(FanOutOptions::unordered_unbounded())),
        ("fan_out_pool_10k", FanOut::new(FanOutOptions::default())),
        (
            "fan_out_pool_completion_10k",
            FanOut::new(
                FanOutOptions::default()
                    .with_order(ResultOrder::Completion)
                    .with_concurrency(Concurrency::available_parallelism()),
            ),
        ),
    ];

    for (name, engine) in engines {
        c.bench_function(name, |b| {
            b.iter(|| {
                let set = runtime
                    .block_on(engine.compute(SOURCE, &candidates))
                    .expect("fan-out succeeds");
                black_box(set.len())
            });
        });
    }
}

criterion_group!(benches, benchmark_distance, benchmark_fan_out);
criterion_main!(benches);

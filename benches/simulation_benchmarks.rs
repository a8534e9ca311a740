use absim::continuous::stattests::ttest;
use absim::{Allocation, Alternative, ContinuousSimulation, DiscreteSimulation, Series};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_ttest(c: &mut Criterion) {
    let control: Vec<f64> = (0..100).map(|i| (i as f64 * 0.37).sin() * 3.0).collect();
    let treatment: Vec<f64> = (0..100)
        .map(|i| (i as f64 * 0.53).cos() * 3.0 + 1.0)
        .collect();

    c.bench_function("ttest_100", |b| {
        b.iter(|| ttest(black_box(&control), black_box(&treatment), Alternative::TwoSided))
    });
}

fn bench_continuous_simulation(c: &mut Criterion) {
    let values: Vec<f64> = (0..1000).map(|i| (i as f64 * 0.91).sin() * 3.0).collect();

    c.bench_function("continuous_ttest_100_trials", |b| {
        b.iter(|| {
            let sim = ContinuousSimulation::builder(Series::from_values("metric", values.clone()))
                .with_procedures(["ttest"])
                .with_allocation(Allocation::balanced(36))
                .with_experiments_num(100)
                .with_mde(2.0)
                .with_seed(1)
                .build()
                .unwrap();
            sim.run().unwrap()
        })
    });
}

fn bench_discrete_simulation(c: &mut Criterion) {
    c.bench_function("discrete_ztest_100_trials", |b| {
        b.iter(|| {
            let sim = DiscreteSimulation::builder(400, 2000)
                .with_procedures(["conversion_ztest"])
                .with_allocation(Allocation::balanced(1006))
                .with_experiments_num(100)
                .with_mde(0.05)
                .with_seed(1)
                .build()
                .unwrap();
            sim.run().unwrap()
        })
    });
}

criterion_group!(
    benches,
    bench_ttest,
    bench_continuous_simulation,
    bench_discrete_simulation
);
criterion_main!(benches);

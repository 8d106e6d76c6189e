//! Reachability engine benchmarks on generated nets.
//!
//! Run with:
//! ```bash
//! cargo bench --bench reachability
//! ```

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use petri_reach::bdd::BddConfig;
use petri_reach::explicit::explore;
use petri_reach::generators::{mutex, philosophers, random};
use petri_reach::search::find_deadlock;
use petri_reach::symbolic::{build, build_with};

fn bench_explicit(c: &mut Criterion) {
    let mut group = c.benchmark_group("explicit");

    for n in [3, 4, 5] {
        let net = philosophers(n);
        let markings = explore(&net).map(|set| set.len()).unwrap_or(0);
        group.throughput(Throughput::Elements(markings as u64));
        group.bench_with_input(BenchmarkId::new("philosophers", n), &net, |b, net| {
            b.iter(|| explore(black_box(net)).map(|set| set.len()))
        });
    }

    group.finish();
}

fn bench_symbolic(c: &mut Criterion) {
    let mut group = c.benchmark_group("symbolic");
    group.sample_size(10);

    for n in [3, 4, 5] {
        let net = philosophers(n);
        group.bench_with_input(BenchmarkId::new("philosophers", n), &net, |b, net| {
            b.iter(|| build(black_box(net)).count().clone())
        });
    }

    for n in [8, 16, 32] {
        let net = mutex(n);
        group.bench_with_input(BenchmarkId::new("mutex", n), &net, |b, net| {
            b.iter(|| build(black_box(net)).count().clone())
        });
    }

    // Same random net, different computed-table sizes.
    let net = random(30, 24, 1);
    for cache_bits in [10, 14, 18] {
        group.bench_with_input(
            BenchmarkId::new("random-30x24", format!("2^{}", cache_bits)),
            &cache_bits,
            |b, &cache_bits| {
                b.iter(|| {
                    let config = BddConfig::default().with_cache_bits(cache_bits);
                    build_with(black_box(&net), config).count().clone()
                })
            },
        );
    }

    group.finish();
}

fn bench_deadlock(c: &mut Criterion) {
    let mut group = c.benchmark_group("deadlock");
    group.sample_size(10);

    for n in [3, 4, 5] {
        let net = philosophers(n);
        let reachable = build(&net);
        group.bench_with_input(BenchmarkId::new("philosophers", n), &net, |b, net| {
            b.iter(|| find_deadlock(black_box(net), &reachable).attempts())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_explicit, bench_symbolic, bench_deadlock);
criterion_main!(benches);

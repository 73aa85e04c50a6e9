//! replay-timeline 성능 벤치마크
//!
//! 실행: cargo bench -p replay-timeline

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

use replay_core::models::observation::{EventKind, Observation};
use replay_timeline::consolidation::{consolidate, TypingMergePolicy};

/// TYPE 버스트와 클릭이 섞인 관측 목록 생성
fn make_observations(n: usize) -> Vec<Observation> {
    (0..n)
        .map(|i| {
            let t = i as f64 * 2.0;
            if i % 7 == 6 {
                Observation::new(t, EventKind::Click, "Submit")
            } else {
                Observation::new(t, EventKind::Type, format!("w{i}"))
            }
        })
        .collect()
}

fn bench_consolidate(c: &mut Criterion) {
    let mut group = c.benchmark_group("consolidate");
    let policy = TypingMergePolicy::default();

    for n in [100usize, 1_000, 10_000] {
        let observations = make_observations(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &observations, |b, obs| {
            b.iter(|| consolidate(black_box(obs), &policy))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_consolidate);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use futures_util::future::ready;

use cadence_core::reactive::{ReactiveRuntime, ReactiveValue};
use cadence_core::{SequentialSchedule, TaskId};

fn build_chain(len: usize) -> SequentialSchedule<u64> {
    let mut schedule = SequentialSchedule::new();
    let mut previous: Option<TaskId> = None;
    for _ in 0..len {
        let prerequisites: Vec<TaskId> = previous.into_iter().collect();
        let id = schedule
            .create_task(
                |n: u64| {
                    black_box(n + 1);
                    ready(Ok(()))
                },
                &prerequisites,
            )
            .unwrap();
        previous = Some(id);
    }
    schedule
}

fn benchmark_registration(c: &mut Criterion) {
    c.bench_function("create_task chain 200", |b| {
        b.iter(|| black_box(build_chain(200)))
    });
}

fn benchmark_start_no_yield(c: &mut Criterion) {
    let schedule = build_chain(1000);
    c.bench_function("start_no_yield chain 1000", |b| {
        b.iter(|| schedule.start_no_yield(black_box(7)).unwrap())
    });
}

fn benchmark_coalesced_derivation(c: &mut Criterion) {
    c.bench_function("derive 100 sets then flush", |b| {
        b.iter(|| {
            let runtime = ReactiveRuntime::new();
            let base = ReactiveValue::new(0u64);
            let source = base.clone();
            let derived = runtime.derive(move |t| t.track(&source) * 2);
            for i in 0..100 {
                base.set(i).unwrap();
            }
            runtime.flush();
            black_box(derived.current())
        })
    });
}

criterion_group!(
    benches,
    benchmark_registration,
    benchmark_start_no_yield,
    benchmark_coalesced_derivation
);
criterion_main!(benches);

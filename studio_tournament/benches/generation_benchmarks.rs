use chrono::Utc;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use studio_tournament::tournament::{
    Group, Match, SlotAllocator,
    partition::partition,
    scheduler, standings,
    state_machine::{MatchTransition, ScoreSubmission},
};

/// Helper to create a registration-ordered participant list
fn participants(n: usize) -> Vec<i64> {
    (1..=n as i64).collect()
}

/// Helper to create a fully played round-robin
fn played_round_robin(n: usize) -> (Vec<i64>, Vec<Match>) {
    let players = participants(n);
    let allocator = SlotAllocator::new(8, 30, Utc::now()).unwrap();
    let matches = allocator
        .allocate(0, scheduler::round_robin(&players))
        .unwrap()
        .iter()
        .enumerate()
        .map(|(idx, scheduled)| {
            let mut m = Match::from_scheduled(idx as i64 + 1, 1, None, scheduled);
            let (a, b) = ((idx % 5) as i64, (idx % 3) as i64);
            m.apply(MatchTransition::Record(ScoreSubmission::new(a, b)), Utc::now())
                .unwrap();
            m
        })
        .collect();
    (players, matches)
}

/// Benchmark round-robin pairing plus slot allocation
fn bench_round_robin_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("round_robin_generation");

    for n in [8, 32, 128].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_participants", n)),
            n,
            |b, &n| {
                let players = participants(n);
                let allocator = SlotAllocator::new(8, 30, Utc::now()).unwrap();
                b.iter(|| allocator.allocate(0, scheduler::round_robin(black_box(&players))));
            },
        );
    }

    group.finish();
}

/// Benchmark seeded partitioning plus group-stage pairing
fn bench_group_stage_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("group_stage_generation");

    for n in [16, 64, 256].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_participants", n)),
            n,
            |b, &n| {
                let players = participants(n);
                b.iter(|| {
                    let groups = partition(black_box(&players), 5, 42).unwrap();
                    scheduler::group_stage(&groups)
                });
            },
        );
    }

    group.finish();
}

/// Benchmark standings over a completed round-robin
fn bench_standings(c: &mut Criterion) {
    let mut group = c.benchmark_group("standings");
    let no_groups: Vec<Group> = Vec::new();

    for n in [8, 32, 64].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_participants", n)),
            n,
            |b, &n| {
                let (players, matches) = played_round_robin(n);
                b.iter(|| standings::aggregate(&players, &no_groups, black_box(&matches)));
            },
        );
    }

    group.finish();
}

criterion_group!(
    generation,
    bench_round_robin_generation,
    bench_group_stage_generation,
);

criterion_group!(results, bench_standings);

criterion_main!(generation, results);

//! Co-visitation benchmarks
//!
//! Covers:
//! 1. Graph accumulation per chunk for each graph kind
//! 2. Top-K compaction of an accumulated graph
//! 3. Candidate generation per session
//! 4. Parallel table build over in-memory chunks
//!
//! Run: cargo bench --bench covisitation

use covisit_service::{
    CandidateGenerator, GraphAccumulator, GraphKind, MemoryChunkSource, MemoryTableStore,
    ScoringParams, TableBuildConfig, TableBuildJob, TopKCompactor, TopKTable,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use event_schema::{EventRecord, EventType, HistoryEvent, SessionHistory};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

fn synthetic_chunk(rng: &mut StdRng, sessions: u64, catalogue: u64) -> Vec<EventRecord> {
    let mut records = Vec::new();
    for session in 0..sessions {
        let mut ts = rng.gen_range(0..1_000_000i64);
        for _ in 0..rng.gen_range(1..40) {
            ts += rng.gen_range(0..600_000);
            let event_type = match rng.gen_range(0..10) {
                0 => EventType::Order,
                1 | 2 => EventType::Cart,
                _ => EventType::Click,
            };
            records.push(EventRecord::new(
                session,
                rng.gen_range(0..catalogue),
                ts,
                event_type,
            ));
        }
    }
    records
}

// ============================================
// Benchmark 1: accumulation
// ============================================

fn benchmark_accumulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("accumulation");
    group.measurement_time(Duration::from_secs(10));

    let mut rng = StdRng::seed_from_u64(7);
    let chunk = synthetic_chunk(&mut rng, 2_000, 5_000);

    for kind in GraphKind::ALL {
        group.bench_with_input(BenchmarkId::new("ingest_chunk", kind), &kind, |b, &kind| {
            b.iter(|| {
                let mut accumulator =
                    GraphAccumulator::for_kind(kind, ScoringParams::default(), 16);
                accumulator.ingest_chunk(black_box(chunk.clone()));
                accumulator.finish()
            });
        });
    }

    group.finish();
}

// ============================================
// Benchmark 2: compaction
// ============================================

fn benchmark_compaction(c: &mut Criterion) {
    let mut group = c.benchmark_group("compaction");

    let mut rng = StdRng::seed_from_u64(11);
    let mut accumulator =
        GraphAccumulator::for_kind(GraphKind::Click2Click, ScoringParams::default(), 16);
    accumulator.ingest_chunk(synthetic_chunk(&mut rng, 5_000, 5_000));
    let (adjacency, _) = accumulator.finish();

    for k in [20, 40] {
        group.bench_with_input(BenchmarkId::new("top_k", k), &k, |b, &k| {
            let compactor = TopKCompactor::new(k);
            b.iter(|| compactor.compact(GraphKind::Click2Click, black_box(adjacency.clone())));
        });
    }

    group.finish();
}

// ============================================
// Benchmark 3: candidate generation
// ============================================

fn random_table(rng: &mut StdRng, kind: GraphKind, catalogue: u64) -> Arc<TopKTable> {
    let rows: HashMap<_, _> = (0..catalogue)
        .map(|item| {
            let mut neighbors: Vec<u64> = (0..20).map(|_| rng.gen_range(0..catalogue)).collect();
            neighbors.sort_unstable();
            neighbors.dedup();
            neighbors.retain(|n| *n != item);
            (item, neighbors)
        })
        .collect();
    Arc::new(TopKTable::from_rows(kind, rows, 20).expect("valid table"))
}

fn benchmark_candidate_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("candidates");

    let mut rng = StdRng::seed_from_u64(3);
    let generator = CandidateGenerator::new(
        random_table(&mut rng, GraphKind::Click2Click, 10_000),
        random_table(&mut rng, GraphKind::Click2Buy, 10_000),
        random_table(&mut rng, GraphKind::Buy2Buy, 10_000),
        20,
    )
    .expect("tables");

    for history_len in [1, 5, 30] {
        let events: Vec<HistoryEvent> = (0..history_len)
            .map(|_| {
                let event_type = if rng.gen_bool(0.2) {
                    EventType::Cart
                } else {
                    EventType::Click
                };
                HistoryEvent::new(rng.gen_range(0..10_000), event_type)
            })
            .collect();
        let session = SessionHistory::new(1, events);

        group.bench_with_input(
            BenchmarkId::new("recommend", history_len),
            &session,
            |b, session| b.iter(|| generator.recommend(black_box(session))),
        );
    }

    group.finish();
}

// ============================================
// Benchmark 4: parallel table build
// ============================================

fn benchmark_table_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_build");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(20));

    let mut rng = StdRng::seed_from_u64(42);
    let mut source = MemoryChunkSource::new();
    for idx in 0..8 {
        source = source.with_chunk(format!("{:03}", idx), synthetic_chunk(&mut rng, 1_000, 5_000));
    }
    let source = Arc::new(source);

    for workers in [1, 4] {
        group.bench_with_input(BenchmarkId::new("workers", workers), &workers, |b, &workers| {
            let rt = Runtime::new().expect("runtime");
            b.to_async(&rt).iter(|| {
                let source = Arc::clone(&source);
                async move {
                    let config = TableBuildConfig {
                        workers,
                        skip_existing: false,
                        ..Default::default()
                    };
                    let job =
                        TableBuildJob::new(config, source, Arc::new(MemoryTableStore::new()));
                    job.run().await
                }
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_accumulation,
    benchmark_compaction,
    benchmark_candidate_generation,
    benchmark_table_build
);
criterion_main!(benches);

// ============================================
// Table Build Job
// ============================================
//
// For each graph kind (buy2buy, click2click, click2buy):
// 1. Skip it if the store already has the table (unless disabled)
// 2. Partition the chunk list round-robin across workers; every worker owns a
//    partial accumulator and folds its chunks on the blocking pool
// 3. Merge the partial graphs by elementwise sum
// 4. Compact to Top-K and persist
//
// Graph kinds are built one after another so that only one transient graph is
// alive at a time. A failing kind is reported and the remaining kinds still run.

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{AccumulationStats, CompactionStats, GraphKind};
use crate::services::compaction::TopKCompactor;
use crate::services::covisitation::{scorer_for, GraphAccumulator, ScoringParams, WeightedAdjacency};
use crate::storage::{ChunkSource, TableStore};
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct TableBuildConfig {
    /// Parallel accumulation workers
    pub workers: usize,
    /// Shards of every partial adjacency
    pub shards: usize,
    /// Neighbours kept per item
    pub top_k: usize,
    /// Leave already persisted tables untouched
    pub skip_existing: bool,
    pub scoring: ScoringParams,
}

impl Default for TableBuildConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            shards: 16,
            top_k: 20,
            skip_existing: true,
            scoring: ScoringParams::default(),
        }
    }
}

impl TableBuildConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            workers: config.build_workers,
            shards: config.adjacency_shards,
            top_k: config.top_k,
            skip_existing: config.skip_existing_tables,
            scoring: ScoringParams::from_config(config),
        }
    }
}

/// Outcome of building one graph kind
#[derive(Debug, Clone, PartialEq)]
pub struct KindBuildStats {
    pub kind: GraphKind,
    pub skipped_existing: bool,
    pub chunks_listed: u64,
    pub chunks_malformed: u64,
    pub accumulation: AccumulationStats,
    pub graph_items: u64,
    pub graph_edges: u64,
    pub compaction: CompactionStats,
    pub duration_ms: u64,
}

impl KindBuildStats {
    fn skipped(kind: GraphKind) -> Self {
        Self {
            kind,
            skipped_existing: true,
            chunks_listed: 0,
            chunks_malformed: 0,
            accumulation: AccumulationStats::default(),
            graph_items: 0,
            graph_edges: 0,
            compaction: CompactionStats::default(),
            duration_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub built: Vec<KindBuildStats>,
    pub failed: Vec<(GraphKind, String)>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn stats_for(&self, kind: GraphKind) -> Option<&KindBuildStats> {
        self.built.iter().find(|stats| stats.kind == kind)
    }

    /// Wall-clock length of the run, once it has completed
    pub fn elapsed_ms(&self) -> Option<i64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }
}

/// Partial graph produced by one worker
struct WorkerOutput {
    accumulator: GraphAccumulator,
    malformed: u64,
}

pub struct TableBuildJob {
    config: TableBuildConfig,
    chunks: Arc<dyn ChunkSource>,
    store: Arc<dyn TableStore>,
}

impl TableBuildJob {
    pub fn new(
        config: TableBuildConfig,
        chunks: Arc<dyn ChunkSource>,
        store: Arc<dyn TableStore>,
    ) -> Self {
        Self {
            config,
            chunks,
            store,
        }
    }

    /// Build every graph kind; failures are collected in the report
    pub async fn run(&self) -> BuildReport {
        let mut report = BuildReport {
            started_at: Some(Utc::now()),
            ..Default::default()
        };

        info!(
            workers = self.config.workers,
            shards = self.config.shards,
            top_k = self.config.top_k,
            skip_existing = self.config.skip_existing,
            "Starting table build job"
        );

        for kind in GraphKind::ALL {
            match self.build_kind(kind).await {
                Ok(stats) => report.built.push(stats),
                Err(e) => {
                    error!(kind = %kind, error = %e, "Table build failed");
                    report.failed.push((kind, e.to_string()));
                }
            }
        }

        report.completed_at = Some(Utc::now());
        info!(
            built = report.built.len(),
            failed = report.failed.len(),
            elapsed_ms = ?report.elapsed_ms(),
            "Table build job completed"
        );
        report
    }

    pub async fn build_kind(&self, kind: GraphKind) -> Result<KindBuildStats> {
        if self.config.skip_existing && self.store.exists(kind).await? {
            info!(kind = %kind, "Table already exists, skipping");
            return Ok(KindBuildStats::skipped(kind));
        }

        let start = Instant::now();
        let chunk_ids = self.chunks.list_chunks().await?;
        let chunks_listed = chunk_ids.len() as u64;

        let (adjacency, accumulation, chunks_malformed) =
            self.accumulate(kind, chunk_ids).await?;
        let graph_items = adjacency.item_count() as u64;
        let graph_edges = adjacency.edge_count() as u64;

        info!(
            kind = %kind,
            chunks = chunks_listed,
            malformed = chunks_malformed,
            sessions = accumulation.sessions_seen,
            pair_increments = accumulation.pair_increments,
            items = graph_items,
            edges = graph_edges,
            "Graph accumulated"
        );

        let compactor = TopKCompactor::new(self.config.top_k);
        let (table, compaction) =
            tokio::task::spawn_blocking(move || compactor.compact(kind, adjacency)).await?;
        self.store.save(&table).await?;

        Ok(KindBuildStats {
            kind,
            skipped_existing: false,
            chunks_listed,
            chunks_malformed,
            accumulation,
            graph_items,
            graph_edges,
            compaction,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Accumulate `kind` over all chunks and merge the worker partials
    pub async fn accumulate(
        &self,
        kind: GraphKind,
        chunk_ids: Vec<String>,
    ) -> Result<(WeightedAdjacency, AccumulationStats, u64)> {
        let scorer = scorer_for(kind, self.config.scoring);
        let workers = self.config.workers.max(1);

        let mut partitions: Vec<Vec<String>> = vec![Vec::new(); workers];
        for (idx, chunk) in chunk_ids.into_iter().enumerate() {
            partitions[idx % workers].push(chunk);
        }

        let handles: Vec<_> = partitions
            .into_iter()
            .filter(|partition| !partition.is_empty())
            .map(|partition| {
                let chunks = Arc::clone(&self.chunks);
                let accumulator = GraphAccumulator::new(Arc::clone(&scorer), self.config.shards);
                tokio::spawn(run_worker(chunks, accumulator, partition))
            })
            .collect();

        let mut merged = GraphAccumulator::new(scorer, self.config.shards);
        let mut malformed = 0;
        for output in try_join_all(handles).await? {
            let output = output?;
            malformed += output.malformed;
            merged.merge(output.accumulator)?;
        }

        let (adjacency, stats) = merged.finish();
        Ok((adjacency, stats, malformed))
    }
}

async fn run_worker(
    chunks: Arc<dyn ChunkSource>,
    mut accumulator: GraphAccumulator,
    partition: Vec<String>,
) -> Result<WorkerOutput> {
    let mut malformed = 0;

    for chunk in partition {
        let records = match chunks.load_chunk(&chunk).await {
            Ok(records) => records,
            Err(AppError::MalformedChunk { chunk, reason }) => {
                warn!(
                    kind = %accumulator.kind(),
                    chunk = %chunk,
                    reason = %reason,
                    "Skipping malformed chunk"
                );
                malformed += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        accumulator = tokio::task::spawn_blocking(move || {
            accumulator.ingest_chunk(records);
            accumulator
        })
        .await?;
    }

    Ok(WorkerOutput {
        accumulator,
        malformed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TopKTable;
    use crate::storage::{MemoryChunkSource, MemoryTableStore, MockChunkSource, MockTableStore};
    use event_schema::{EventRecord, EventType};

    fn source() -> MemoryChunkSource {
        MemoryChunkSource::new()
            .with_chunk(
                "000.jsonl",
                vec![
                    EventRecord::new(1, 1, 0, EventType::Cart),
                    EventRecord::new(1, 2, 10, EventType::Order),
                ],
            )
            .with_chunk(
                "001.jsonl",
                vec![
                    EventRecord::new(2, 2, 0, EventType::Click),
                    EventRecord::new(2, 3, 5, EventType::Cart),
                    EventRecord::new(2, 1, 9, EventType::Cart),
                ],
            )
    }

    #[tokio::test]
    async fn test_run_builds_all_tables() {
        let store = Arc::new(MemoryTableStore::new());
        let job = TableBuildJob::new(
            TableBuildConfig {
                workers: 2,
                ..Default::default()
            },
            Arc::new(source()),
            store.clone(),
        );

        let report = job.run().await;

        assert!(report.is_success());
        assert_eq!(report.built.len(), 3);
        assert!(report.elapsed_ms().is_some_and(|ms| ms >= 0));
        for kind in GraphKind::ALL {
            assert!(store.get(kind).is_some(), "missing {kind} table");
        }
        let buy2buy = store.get(GraphKind::Buy2Buy).expect("buy2buy");
        assert_eq!(buy2buy.neighbors(1), Some(&[2, 3][..]));
        assert_eq!(report.stats_for(GraphKind::Buy2Buy).map(|s| s.chunks_listed), Some(2));
    }

    #[tokio::test]
    async fn test_existing_tables_are_skipped() {
        let store = Arc::new(MemoryTableStore::new());
        store.save(&TopKTable::new(GraphKind::Click2Click)).await.expect("seed");

        let job = TableBuildJob::new(TableBuildConfig::default(), Arc::new(source()), store.clone());
        let report = job.run().await;

        let click2click = report.stats_for(GraphKind::Click2Click).expect("stats");
        assert!(click2click.skipped_existing);
        assert!(store.get(GraphKind::Click2Click).expect("kept").is_empty());
        assert!(!report.stats_for(GraphKind::Buy2Buy).expect("stats").skipped_existing);
    }

    #[tokio::test]
    async fn test_malformed_chunk_contributes_nothing() {
        let mut chunks = MockChunkSource::new();
        chunks
            .expect_list_chunks()
            .returning(|| Ok(vec!["good".to_string(), "bad".to_string()]));
        chunks.expect_load_chunk().returning(|chunk| match chunk {
            "good" => Ok(vec![
                EventRecord::new(1, 1, 0, EventType::Cart),
                EventRecord::new(1, 2, 0, EventType::Cart),
            ]),
            other => Err(AppError::MalformedChunk {
                chunk: other.to_string(),
                reason: "line 1: expected value".to_string(),
            }),
        });

        let store = Arc::new(MemoryTableStore::new());
        let job = TableBuildJob::new(TableBuildConfig::default(), Arc::new(chunks), store.clone());
        let stats = job.build_kind(GraphKind::Buy2Buy).await.expect("build");

        assert_eq!(stats.chunks_listed, 2);
        assert_eq!(stats.chunks_malformed, 1);
        assert_eq!(stats.accumulation.chunks_processed, 1);
        assert_eq!(
            store.get(GraphKind::Buy2Buy).expect("saved").neighbors(2),
            Some(&[1][..])
        );
    }

    #[tokio::test]
    async fn test_one_failing_kind_does_not_block_others() {
        let mut store = MockTableStore::new();
        store.expect_exists().returning(|_| Ok(false));
        store.expect_save().returning(|table| match table.kind() {
            GraphKind::Click2Click => Err(AppError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            ))),
            _ => Ok(()),
        });

        let job = TableBuildJob::new(TableBuildConfig::default(), Arc::new(source()), Arc::new(store));
        let report = job.run().await;

        assert!(!report.is_success());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, GraphKind::Click2Click);
        assert!(report.stats_for(GraphKind::Buy2Buy).is_some());
        assert!(report.stats_for(GraphKind::Click2Buy).is_some());
    }

    #[tokio::test]
    async fn test_listing_failure_fails_the_kind() {
        let mut chunks = MockChunkSource::new();
        chunks.expect_list_chunks().returning(|| {
            Err(AppError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such directory",
            )))
        });

        let job = TableBuildJob::new(
            TableBuildConfig::default(),
            Arc::new(chunks),
            Arc::new(MemoryTableStore::new()),
        );
        assert!(matches!(job.build_kind(GraphKind::Click2Buy).await, Err(AppError::Io(_))));
    }

    #[tokio::test]
    async fn test_no_chunks_gives_empty_table() {
        let store = Arc::new(MemoryTableStore::new());
        let job = TableBuildJob::new(
            TableBuildConfig::default(),
            Arc::new(MemoryChunkSource::new()),
            store.clone(),
        );

        let stats = job.build_kind(GraphKind::Click2Buy).await.expect("build");
        assert_eq!(stats.graph_items, 0);
        assert!(store.get(GraphKind::Click2Buy).expect("saved").is_empty());
    }
}

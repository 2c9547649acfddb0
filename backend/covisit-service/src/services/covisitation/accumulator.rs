use super::{scorer_for, CovisitationScorer, PairIncrement, ScoringParams, WeightedAdjacency};
use crate::error::{AppError, Result};
use crate::models::{AccumulationStats, GraphKind};
use event_schema::{group_sessions, EventRecord, SessionBatch};
use std::sync::Arc;
use tracing::debug;

/// Builds one co-visitation graph from session batches.
///
/// Each worker owns its own accumulator; partial accumulators of the same
/// graph kind are combined with [`GraphAccumulator::merge`] before compaction.
pub struct GraphAccumulator {
    scorer: Arc<dyn CovisitationScorer>,
    adjacency: WeightedAdjacency,
    stats: AccumulationStats,
    scratch: Vec<PairIncrement>,
}

impl GraphAccumulator {
    pub fn new(scorer: Arc<dyn CovisitationScorer>, shard_count: usize) -> Self {
        Self {
            scorer,
            adjacency: WeightedAdjacency::with_shards(shard_count),
            stats: AccumulationStats::default(),
            scratch: Vec::new(),
        }
    }

    pub fn for_kind(kind: GraphKind, params: ScoringParams, shard_count: usize) -> Self {
        Self::new(scorer_for(kind, params), shard_count)
    }

    pub fn kind(&self) -> GraphKind {
        self.scorer.kind()
    }

    pub fn ingest_session(&mut self, session: &SessionBatch) {
        self.scratch.clear();
        self.scorer.score_session(session, &mut self.scratch);

        for increment in &self.scratch {
            self.adjacency
                .add_pair(increment.a, increment.b, increment.weight);
        }
        self.stats.sessions_seen += 1;
        self.stats.pair_increments += self.scratch.len() as u64;
    }

    /// Group a chunk's records into sessions and ingest each of them.
    /// An empty chunk is a no-op apart from being counted.
    pub fn ingest_chunk(&mut self, records: Vec<EventRecord>) {
        let sessions = group_sessions(records);
        for session in &sessions {
            self.ingest_session(session);
        }
        self.stats.chunks_processed += 1;

        debug!(
            kind = %self.kind(),
            sessions = sessions.len(),
            items = self.adjacency.item_count(),
            "Chunk accumulated"
        );
    }

    /// Fold another partial accumulator of the same graph kind into this one
    pub fn merge(&mut self, other: GraphAccumulator) -> Result<()> {
        if other.kind() != self.kind() {
            return Err(AppError::Internal(format!(
                "cannot merge {} accumulator into {} accumulator",
                other.kind(),
                self.kind()
            )));
        }
        self.adjacency.merge(other.adjacency);
        self.stats.absorb(&other.stats);
        Ok(())
    }

    pub fn adjacency(&self) -> &WeightedAdjacency {
        &self.adjacency
    }

    pub fn stats(&self) -> &AccumulationStats {
        &self.stats
    }

    pub fn finish(self) -> (WeightedAdjacency, AccumulationStats) {
        (self.adjacency, self.stats)
    }
}

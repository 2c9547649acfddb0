use crate::models::{CompactionStats, GraphKind, TopKTable};
use crate::services::covisitation::{AdjacencyRow, WeightedAdjacency};
use event_schema::ItemId;
use std::cmp::Ordering;
use tracing::{debug, info};

/// Turns a fully accumulated graph into bounded neighbour lists.
///
/// Rows are consumed one at a time: each source row is dropped as soon as its
/// Top-K row is built, so the full graph and the full table never coexist.
/// Neighbours are ranked by weight, descending; equal weights are ordered by
/// ascending item id.
#[derive(Debug, Clone, Copy)]
pub struct TopKCompactor {
    k: usize,
}

impl TopKCompactor {
    pub fn new(k: usize) -> Self {
        Self { k: k.max(1) }
    }

    pub fn compact(
        &self,
        kind: GraphKind,
        adjacency: WeightedAdjacency,
    ) -> (TopKTable, CompactionStats) {
        let mut table = TopKTable::new(kind);
        let mut stats = CompactionStats::default();

        for (shard_idx, shard) in adjacency.into_shards().into_iter().enumerate() {
            let shard_rows = shard.len();
            for (item, row) in shard {
                let width = row.len() as u64;
                let neighbors = self.top_k_row(row);

                stats.rows += 1;
                stats.neighbors_kept += neighbors.len() as u64;
                stats.neighbors_dropped += width - neighbors.len() as u64;
                if width > self.k as u64 {
                    stats.truncated_rows += 1;
                }
                table.insert_row(item, neighbors);
            }
            debug!(kind = %kind, shard = shard_idx, rows = shard_rows, "Shard compacted");
        }

        info!(
            kind = %kind,
            rows = stats.rows,
            truncated_rows = stats.truncated_rows,
            neighbors_kept = stats.neighbors_kept,
            neighbors_dropped = stats.neighbors_dropped,
            "Top-{} compaction completed",
            self.k
        );

        (table, stats)
    }

    /// Strongest `k` neighbours of one row, consuming the row
    pub fn top_k_row(&self, row: AdjacencyRow) -> Vec<ItemId> {
        let mut entries: Vec<(ItemId, f64)> = row.into_iter().collect();
        if entries.len() > self.k {
            entries.select_nth_unstable_by(self.k - 1, by_weight_desc);
            entries.truncate(self.k);
        }
        entries.sort_unstable_by(by_weight_desc);
        entries.into_iter().map(|(item, _)| item).collect()
    }
}

fn by_weight_desc(a: &(ItemId, f64), b: &(ItemId, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

use event_schema::ItemId;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Neighbour weights of a single item
pub type AdjacencyRow = HashMap<ItemId, f64>;

/// Fibonacci hashing multiplier (2^64 / golden ratio)
const SHARD_HASH_MULTIPLIER: u64 = 0x9E37_79B9_7F4A_7C15;

/// Sparse weighted co-visitation graph, sharded by item id.
///
/// Weights only ever grow; a row exists for every item that has received at
/// least one increment. Merging two adjacencies sums weights elementwise, so
/// partial graphs built from disjoint chunk sets can be combined in any order.
#[derive(Debug, Clone)]
pub struct WeightedAdjacency {
    shards: Vec<HashMap<ItemId, AdjacencyRow>>,
}

impl WeightedAdjacency {
    pub fn with_shards(shard_count: usize) -> Self {
        let shard_count = shard_count.max(1);
        Self {
            shards: (0..shard_count).map(|_| HashMap::new()).collect(),
        }
    }

    fn shard_of(&self, item: ItemId) -> usize {
        let hashed = item.wrapping_mul(SHARD_HASH_MULTIPLIER) >> 32;
        (hashed % self.shards.len() as u64) as usize
    }

    /// Credit `weight` to the directed edge `from -> to`
    pub fn add(&mut self, from: ItemId, to: ItemId, weight: f64) {
        debug_assert!(weight >= 0.0, "co-visitation weights are non-negative");
        let shard = self.shard_of(from);
        *self.shards[shard]
            .entry(from)
            .or_default()
            .entry(to)
            .or_insert(0.0) += weight;
    }

    /// Credit `weight` to both directions of the pair
    pub fn add_pair(&mut self, a: ItemId, b: ItemId, weight: f64) {
        self.add(a, b, weight);
        self.add(b, a, weight);
    }

    pub fn weight(&self, from: ItemId, to: ItemId) -> f64 {
        self.row(from)
            .and_then(|row| row.get(&to))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn row(&self, item: ItemId) -> Option<&AdjacencyRow> {
        self.shards[self.shard_of(item)].get(&item)
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Number of items with at least one neighbour
    pub fn item_count(&self) -> usize {
        self.shards.iter().map(HashMap::len).sum()
    }

    /// Number of directed edges
    pub fn edge_count(&self) -> usize {
        self.shards
            .iter()
            .flat_map(|shard| shard.values())
            .map(HashMap::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(HashMap::is_empty)
    }

    /// Elementwise sum of `other` into `self`. Rows missing on this side are
    /// moved over without copying.
    pub fn merge(&mut self, other: WeightedAdjacency) {
        for shard in other.shards {
            for (item, row) in shard {
                let target = self.shard_of(item);
                match self.shards[target].entry(item) {
                    Entry::Vacant(slot) => {
                        slot.insert(row);
                    }
                    Entry::Occupied(mut slot) => {
                        let existing = slot.get_mut();
                        for (neighbor, weight) in row {
                            *existing.entry(neighbor).or_insert(0.0) += weight;
                        }
                    }
                }
            }
        }
    }

    /// Hand the shards over to the compactor
    pub(crate) fn into_shards(self) -> Vec<HashMap<ItemId, AdjacencyRow>> {
        self.shards
    }
}

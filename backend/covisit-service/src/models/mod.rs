use crate::error::{AppError, Result};
use event_schema::{ItemId, SessionId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// The three co-visitation graphs built from the event log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphKind {
    Buy2Buy,     // 共同加購/購買
    Click2Click, // 點擊 → 點擊
    Click2Buy,   // 點擊 → 加購/購買
}

impl GraphKind {
    /// Build order of the table job
    pub const ALL: [GraphKind; 3] = [GraphKind::Buy2Buy, GraphKind::Click2Click, GraphKind::Click2Buy];

    pub fn as_str(&self) -> &'static str {
        match self {
            GraphKind::Buy2Buy => "buy2buy",
            GraphKind::Click2Click => "click2click",
            GraphKind::Click2Buy => "click2buy",
        }
    }
}

impl fmt::Display for GraphKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compacted neighbour lists: item -> up to K neighbours, strongest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopKTable {
    kind: GraphKind,
    rows: HashMap<ItemId, Vec<ItemId>>,
}

impl TopKTable {
    pub fn new(kind: GraphKind) -> Self {
        Self {
            kind,
            rows: HashMap::new(),
        }
    }

    /// Build a table from externally supplied rows, enforcing the row cap
    /// and neighbour uniqueness.
    pub fn from_rows(
        kind: GraphKind,
        rows: HashMap<ItemId, Vec<ItemId>>,
        max_row_len: usize,
    ) -> Result<Self> {
        let table = Self { kind, rows };
        table.validate(max_row_len)?;
        Ok(table)
    }

    pub fn validate(&self, max_row_len: usize) -> Result<()> {
        for (item, neighbors) in &self.rows {
            if neighbors.len() > max_row_len {
                return Err(AppError::InvalidTable {
                    kind: self.kind,
                    reason: format!(
                        "item {} has {} neighbours, limit is {}",
                        item,
                        neighbors.len(),
                        max_row_len
                    ),
                });
            }

            let mut seen = HashSet::with_capacity(neighbors.len());
            if let Some(duplicate) = neighbors.iter().find(|n| !seen.insert(**n)) {
                return Err(AppError::InvalidTable {
                    kind: self.kind,
                    reason: format!("item {} lists neighbour {} twice", item, duplicate),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn insert_row(&mut self, item: ItemId, neighbors: Vec<ItemId>) {
        self.rows.insert(item, neighbors);
    }

    pub fn kind(&self) -> GraphKind {
        self.kind
    }

    pub fn neighbors(&self, item: ItemId) -> Option<&[ItemId]> {
        self.rows.get(&item).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ItemId, &[ItemId])> + '_ {
        self.rows.iter().map(|(item, row)| (*item, row.as_slice()))
    }
}

/// Capped, duplicate-free list of items, most relevant first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateList {
    items: Vec<ItemId>,
    seen: HashSet<ItemId>,
    limit: usize,
}

impl CandidateList {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            items: Vec::with_capacity(limit),
            seen: HashSet::with_capacity(limit),
            limit,
        }
    }

    /// Append `item` unless it is already present or the list is full.
    /// Returns whether the item was added.
    pub fn push(&mut self, item: ItemId) -> bool {
        if self.is_full() || !self.seen.insert(item) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Append unseen items in order, stopping at the cap. Returns `true` once full.
    pub fn extend_from(&mut self, items: &[ItemId]) -> bool {
        for item in items {
            if self.is_full() {
                break;
            }
            self.push(*item);
        }
        self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.limit
    }

    pub fn contains(&self, item: ItemId) -> bool {
        self.seen.contains(&item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[ItemId] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<ItemId> {
        self.items
    }
}

/// Three candidate lists for one session request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecommendation {
    pub session_id: SessionId,
    pub clicks: Vec<ItemId>,
    pub carts: Vec<ItemId>,
    pub orders: Vec<ItemId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccumulationStats {
    pub chunks_processed: u64,
    pub sessions_seen: u64,
    pub pair_increments: u64,
}

impl AccumulationStats {
    pub fn absorb(&mut self, other: &AccumulationStats) {
        self.chunks_processed += other.chunks_processed;
        self.sessions_seen += other.sessions_seen;
        self.pair_increments += other.pair_increments;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactionStats {
    pub rows: u64,
    pub truncated_rows: u64,
    pub neighbors_kept: u64,
    pub neighbors_dropped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_kind_names() {
        assert_eq!(GraphKind::Buy2Buy.as_str(), "buy2buy");
        assert_eq!(GraphKind::Click2Click.to_string(), "click2click");
        assert_eq!(
            serde_json::to_string(&GraphKind::Click2Buy).expect("serialize"),
            "\"click2buy\""
        );
    }

    #[test]
    fn test_candidate_list_dedups_and_caps() {
        let mut list = CandidateList::with_limit(3);
        assert!(list.push(1));
        assert!(!list.push(1));
        assert!(!list.extend_from(&[2, 1]));
        assert!(list.extend_from(&[3, 4, 5]));

        assert_eq!(list.as_slice(), &[1, 2, 3]);
        assert!(!list.push(6));
        assert!(!list.contains(4));
    }

    #[test]
    fn test_table_rejects_oversized_row() {
        let mut rows = HashMap::new();
        rows.insert(1, vec![2, 3, 4]);
        let err = TopKTable::from_rows(GraphKind::Buy2Buy, rows, 2).unwrap_err();
        assert!(matches!(err, AppError::InvalidTable { kind: GraphKind::Buy2Buy, .. }));
    }

    #[test]
    fn test_table_rejects_duplicate_neighbor() {
        let mut rows = HashMap::new();
        rows.insert(1, vec![2, 3, 2]);
        assert!(TopKTable::from_rows(GraphKind::Click2Buy, rows, 20).is_err());
    }

    #[test]
    fn test_table_json_roundtrip_keeps_integer_keys() {
        let mut rows = HashMap::new();
        rows.insert(7, vec![3, 9, 11]);
        let table = TopKTable::from_rows(GraphKind::Click2Click, rows, 20).expect("valid");

        let json = serde_json::to_string(&table).expect("serialize");
        let decoded: TopKTable = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(decoded.neighbors(7), Some(&[3, 9, 11][..]));
        assert_eq!(decoded.neighbors(8), None);
    }
}

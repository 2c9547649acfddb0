use crate::error::{AppError, Result};
use crate::models::{CandidateList, GraphKind, SessionRecommendation, TopKTable};
use crate::storage::TableStore;
use event_schema::{HistoryEvent, ItemId, SessionHistory};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

/// Distinct items, most recent first.
///
/// Each item takes the position of its latest occurrence.
pub fn dedup_reverse<I>(items: I) -> Vec<ItemId>
where
    I: IntoIterator<Item = ItemId>,
    I::IntoIter: DoubleEndedIterator,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .rev()
        .filter(|item| seen.insert(*item))
        .collect()
}

/// Candidate generation for incoming sessions.
///
/// Sources are merged in strict priority order with first-seen-wins
/// deduplication:
/// - clicks: own history, then click2click neighbours
/// - carts/orders: own history, then click2buy neighbours of the whole
///   history, then buy2buy neighbours of carted/ordered items
///
/// A history that already has `limit` distinct items is returned as is.
#[derive(Debug, Clone)]
pub struct CandidateGenerator {
    click2click: Arc<TopKTable>,
    click2buy: Arc<TopKTable>,
    buy2buy: Arc<TopKTable>,
    limit: usize,
}

impl CandidateGenerator {
    pub fn new(
        click2click: Arc<TopKTable>,
        click2buy: Arc<TopKTable>,
        buy2buy: Arc<TopKTable>,
        limit: usize,
    ) -> Result<Self> {
        for (table, expected) in [
            (&click2click, GraphKind::Click2Click),
            (&click2buy, GraphKind::Click2Buy),
            (&buy2buy, GraphKind::Buy2Buy),
        ] {
            if table.kind() != expected {
                return Err(AppError::InvalidTable {
                    kind: expected,
                    reason: format!("got a {} table in its place", table.kind()),
                });
            }
        }

        Ok(Self {
            click2click,
            click2buy,
            buy2buy,
            limit: limit.max(1),
        })
    }

    /// Load all three tables. Any missing or invalid table fails the whole
    /// initialisation.
    pub async fn from_store(store: &dyn TableStore, limit: usize) -> Result<Self> {
        let click2click = store.load(GraphKind::Click2Click).await?;
        let click2buy = store.load(GraphKind::Click2Buy).await?;
        let buy2buy = store.load(GraphKind::Buy2Buy).await?;

        info!(
            click2click = click2click.len(),
            click2buy = click2buy.len(),
            buy2buy = buy2buy.len(),
            "Co-visitation tables loaded"
        );

        Self::new(
            Arc::new(click2click),
            Arc::new(click2buy),
            Arc::new(buy2buy),
            limit,
        )
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn suggest_clicks(&self, history: &[HistoryEvent]) -> Vec<ItemId> {
        let seed = dedup_reverse(history.iter().map(|event| event.item_id));
        if seed.len() >= self.limit {
            return truncated(seed, self.limit);
        }

        let mut candidates = CandidateList::with_limit(self.limit);
        candidates.extend_from(&seed);
        expand(&mut candidates, &seed, &self.click2click);
        candidates.into_vec()
    }

    pub fn suggest_buys(&self, history: &[HistoryEvent]) -> Vec<ItemId> {
        let seed = dedup_reverse(history.iter().map(|event| event.item_id));
        if seed.len() >= self.limit {
            return truncated(seed, self.limit);
        }

        let mut candidates = CandidateList::with_limit(self.limit);
        candidates.extend_from(&seed);
        if expand(&mut candidates, &seed, &self.click2buy) {
            return candidates.into_vec();
        }

        let purchase_seed = dedup_reverse(
            history
                .iter()
                .filter(|event| event.event_type.is_purchase())
                .map(|event| event.item_id),
        );
        expand(&mut candidates, &purchase_seed, &self.buy2buy);
        candidates.into_vec()
    }

    /// Clicks, carts and orders for one session; orders mirror carts
    pub fn recommend(&self, session: &SessionHistory) -> SessionRecommendation {
        let clicks = self.suggest_clicks(&session.events);
        let carts = self.suggest_buys(&session.events);

        SessionRecommendation {
            session_id: session.session_id,
            clicks,
            orders: carts.clone(),
            carts,
        }
    }
}

fn truncated(mut items: Vec<ItemId>, limit: usize) -> Vec<ItemId> {
    items.truncate(limit);
    items
}

/// Append neighbours of each seed in table order. Seeds without a row are
/// skipped. Returns `true` once the list is full.
fn expand(candidates: &mut CandidateList, seeds: &[ItemId], table: &TopKTable) -> bool {
    for seed in seeds {
        if let Some(neighbors) = table.neighbors(*seed) {
            if candidates.extend_from(neighbors) {
                return true;
            }
        }
    }
    candidates.is_full()
}

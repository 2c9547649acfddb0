use super::{CovisitationScorer, PairIncrement};
use crate::models::GraphKind;
use event_schema::{ItemId, SessionBatch};

/// Co-purchase graph.
///
/// Every pair of distinct items a session carted or ordered gets one count.
/// Repeats and ordering inside the session are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct Buy2BuyScorer;

impl Buy2BuyScorer {
    pub fn new() -> Self {
        Self
    }
}

impl CovisitationScorer for Buy2BuyScorer {
    fn kind(&self) -> GraphKind {
        GraphKind::Buy2Buy
    }

    fn score_session(&self, session: &SessionBatch, out: &mut Vec<PairIncrement>) {
        let mut items: Vec<ItemId> = session
            .events()
            .iter()
            .filter(|event| event.event_type.is_purchase())
            .map(|event| event.item_id)
            .collect();
        items.sort_unstable();
        items.dedup();

        if items.len() < 2 {
            return;
        }

        for (i, &a) in items.iter().enumerate() {
            for &b in &items[i + 1..] {
                out.push(PairIncrement::new(a, b, 1.0));
            }
        }
    }
}

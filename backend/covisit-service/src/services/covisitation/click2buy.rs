use super::{CovisitationScorer, PairIncrement, ScoringParams};
use crate::models::GraphKind;
use event_schema::SessionBatch;

/// Click-to-purchase graph, weighted by closeness in time.
///
/// Looks at the last `tail_len` events of any type. Every ordered pair
/// `(i, j)` of different items whose second event is a cart-add or order
/// scores `1 + time_weight * (1 - |t_j - t_i| / window_ms)`, and pairs further
/// apart than `window_ms` are skipped. The score is credited to both
/// directions even though only `j` has to be a purchase.
#[derive(Debug, Clone, Copy)]
pub struct Click2BuyScorer {
    params: ScoringParams,
}

impl Click2BuyScorer {
    pub fn new(params: ScoringParams) -> Self {
        Self { params }
    }
}

impl CovisitationScorer for Click2BuyScorer {
    fn kind(&self) -> GraphKind {
        GraphKind::Click2Buy
    }

    fn score_session(&self, session: &SessionBatch, out: &mut Vec<PairIncrement>) {
        let kept = session.tail(self.params.tail_len);
        if kept.len() < 2 {
            return;
        }

        let window = self.params.window_ms.max(0) as u64;
        for (i, a) in kept.iter().enumerate() {
            for (j, b) in kept.iter().enumerate() {
                if i == j || a.item_id == b.item_id || !b.event_type.is_purchase() {
                    continue;
                }

                let time_diff = a.timestamp.abs_diff(b.timestamp);
                if time_diff > window {
                    continue;
                }

                let weight =
                    1.0 + self.params.time_weight * (1.0 - time_diff as f64 / window as f64);
                out.push(PairIncrement::new(a.item_id, b.item_id, weight));
            }
        }
    }
}

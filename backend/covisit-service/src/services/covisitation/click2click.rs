use super::{CovisitationScorer, PairIncrement, ScoringParams};
use crate::models::GraphKind;
use event_schema::{EventRecord, EventType, SessionBatch};

/// Click-to-click graph, weighted towards the end of the session.
///
/// Only the last `tail_len` clicks are considered. A pair `(i, j)` with `i`
/// before `j` scores `1 + time_weight * (t_j - t_min) / duration`, where
/// `t_min` and `duration` are taken over the kept clicks; a zero-length
/// window scores 1. Pairs further apart than `window_ms` are skipped.
#[derive(Debug, Clone, Copy)]
pub struct Click2ClickScorer {
    params: ScoringParams,
}

impl Click2ClickScorer {
    pub fn new(params: ScoringParams) -> Self {
        Self { params }
    }
}

impl CovisitationScorer for Click2ClickScorer {
    fn kind(&self) -> GraphKind {
        GraphKind::Click2Click
    }

    fn score_session(&self, session: &SessionBatch, out: &mut Vec<PairIncrement>) {
        let clicks: Vec<&EventRecord> = session
            .events()
            .iter()
            .filter(|event| event.event_type == EventType::Click)
            .collect();
        let start = clicks.len().saturating_sub(self.params.tail_len);
        let kept = &clicks[start..];

        let (first, last) = match (kept.first(), kept.last()) {
            (Some(first), Some(last)) if kept.len() >= 2 => (first, last),
            _ => return,
        };
        let t_min = first.timestamp;
        let duration = last.timestamp.abs_diff(t_min);
        let window = self.params.window_ms.max(0) as u64;

        for (i, a) in kept.iter().enumerate() {
            for b in &kept[i + 1..] {
                if a.item_id == b.item_id {
                    continue;
                }
                if a.timestamp.abs_diff(b.timestamp) > window {
                    continue;
                }

                let weight = if duration > 0 {
                    1.0 + self.params.time_weight * b.timestamp.abs_diff(t_min) as f64
                        / duration as f64
                } else {
                    1.0
                };
                out.push(PairIncrement::new(a.item_id, b.item_id, weight));
            }
        }
    }
}

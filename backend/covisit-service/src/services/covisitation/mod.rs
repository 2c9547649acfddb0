mod accumulator;
mod adjacency;
mod buy2buy;
mod click2buy;
mod click2click;

use crate::config::Config;
use crate::models::GraphKind;
use event_schema::{ItemId, SessionBatch, TimestampMs, DAY_MS};
use std::sync::Arc;

pub use accumulator::GraphAccumulator;
pub use adjacency::{AdjacencyRow, WeightedAdjacency};
pub use buy2buy::Buy2BuyScorer;
pub use click2buy::Click2BuyScorer;
pub use click2click::Click2ClickScorer;

/// Weight credited to the unordered pair `{a, b}`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairIncrement {
    pub a: ItemId,
    pub b: ItemId,
    pub weight: f64,
}

impl PairIncrement {
    pub fn new(a: ItemId, b: ItemId, weight: f64) -> Self {
        Self { a, b, weight }
    }
}

/// Parameters shared by the time-weighted scorers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringParams {
    /// Events kept from the end of each session
    pub tail_len: usize,
    /// Maximum time distance of a scored pair
    pub window_ms: TimestampMs,
    /// Bonus on top of the base weight of 1.0
    pub time_weight: f64,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            tail_len: 30,
            window_ms: DAY_MS,
            time_weight: 3.0,
        }
    }
}

impl ScoringParams {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tail_len: config.session_tail_len,
            window_ms: config.pair_window_ms,
            ..Self::default()
        }
    }
}

/// Scoring rule of one co-visitation graph
pub trait CovisitationScorer: Send + Sync {
    fn kind(&self) -> GraphKind;

    /// Append the pair increments contributed by `session` to `out`
    fn score_session(&self, session: &SessionBatch, out: &mut Vec<PairIncrement>);
}

pub fn scorer_for(kind: GraphKind, params: ScoringParams) -> Arc<dyn CovisitationScorer> {
    match kind {
        GraphKind::Buy2Buy => Arc::new(Buy2BuyScorer::new()),
        GraphKind::Click2Click => Arc::new(Click2ClickScorer::new(params)),
        GraphKind::Click2Buy => Arc::new(Click2BuyScorer::new(params)),
    }
}

pub mod candidates;
pub mod compaction;
pub mod covisitation;

pub use candidates::{dedup_reverse, CandidateGenerator};
pub use compaction::TopKCompactor;
pub use covisitation::{
    CovisitationScorer, GraphAccumulator, PairIncrement, ScoringParams, WeightedAdjacency,
};

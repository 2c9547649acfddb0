//! Co-visitation recommendations for session event logs.
//!
//! Three item graphs are accumulated from chunked click/cart/order logs
//! (buy2buy, click2click, click2buy), compacted to Top-K neighbour tables and
//! used at serving time to fill per-session candidate lists for clicks, carts
//! and orders.

pub mod config;
pub mod error;
pub mod jobs;
pub mod models;
pub mod services;
pub mod storage;

pub use config::Config;
pub use error::{AppError, Result};
pub use jobs::{BuildReport, SubmissionJob, SubmissionStats, TableBuildConfig, TableBuildJob};
pub use models::{CandidateList, GraphKind, SessionRecommendation, TopKTable};
pub use services::{
    dedup_reverse, CandidateGenerator, CovisitationScorer, GraphAccumulator, ScoringParams,
    TopKCompactor, WeightedAdjacency,
};
pub use storage::{
    ChunkSource, JsonTableStore, JsonlChunkSource, MemoryChunkSource, MemoryTableStore, TableStore,
};

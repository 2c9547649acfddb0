// ============================================
// Batch Jobs
// ============================================
//
// 1. Table build: accumulate the three co-visitation graphs over the
//    training chunks and persist their Top-K tables
// 2. Submission: generate candidate lists for every test session
//
// Triggered from the binary:
//   covisit-service --mode build-tables | submit | all

pub mod build_tables;
pub mod submission;

pub use build_tables::{BuildReport, KindBuildStats, TableBuildConfig, TableBuildJob};
pub use submission::{SubmissionJob, SubmissionStats};

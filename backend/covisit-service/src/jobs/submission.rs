// ============================================
// Submission Job
// ============================================
//
// Reads the test chunks, groups them into sessions and writes three candidate
// lists per session:
//
//   session_type,labels
//   {session}_clicks,{aid} {aid} ...
//   {session}_carts,...
//   {session}_orders,...
//
// Chunks are recommended in parallel on the blocking pool and written in
// listing order; sessions inside a chunk are written by ascending id.

use crate::error::{AppError, Result};
use crate::models::SessionRecommendation;
use crate::services::candidates::CandidateGenerator;
use crate::storage::ChunkSource;
use event_schema::{group_sessions, EventRecord, ItemId};
use futures::{stream, StreamExt};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{info, warn};

pub const SUBMISSION_HEADER: &str = "session_type,labels\n";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionStats {
    pub chunks_processed: u64,
    pub chunks_malformed: u64,
    pub sessions: u64,
    /// Sessions whose click list came out shorter than the cap
    pub short_click_lists: u64,
    pub short_cart_lists: u64,
    pub duration_ms: u64,
}

pub struct SubmissionJob {
    generator: Arc<CandidateGenerator>,
    chunks: Arc<dyn ChunkSource>,
    concurrency: usize,
}

impl SubmissionJob {
    pub fn new(generator: Arc<CandidateGenerator>, chunks: Arc<dyn ChunkSource>) -> Self {
        Self {
            generator,
            chunks,
            concurrency: 4,
        }
    }

    /// Number of chunks recommended concurrently
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Write the submission to `path`, replacing any previous file
    pub async fn write_to_path(&self, path: &Path) -> Result<SubmissionStats> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp_path = path.with_extension("csv.tmp");
        let stats = match self.write_tmp(&tmp_path).await {
            Ok(stats) => stats,
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&tmp_path).await {
                    warn!(
                        path = %tmp_path.display(),
                        error = %cleanup,
                        "Failed to remove partial submission"
                    );
                }
                return Err(e);
            }
        };
        tokio::fs::rename(&tmp_path, path).await?;

        info!(path = %path.display(), sessions = stats.sessions, "Submission written");
        Ok(stats)
    }

    async fn write_tmp(&self, tmp_path: &Path) -> Result<SubmissionStats> {
        let file = tokio::fs::File::create(tmp_path).await?;
        let mut writer = BufWriter::new(file);
        let stats = self.run(&mut writer).await?;
        writer.flush().await?;
        Ok(stats)
    }

    pub async fn run<W>(&self, writer: &mut W) -> Result<SubmissionStats>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let start = Instant::now();
        let mut stats = SubmissionStats::default();
        let limit = self.generator.limit();

        writer.write_all(SUBMISSION_HEADER.as_bytes()).await?;

        let chunk_ids = self.chunks.list_chunks().await?;
        info!(chunks = chunk_ids.len(), "Starting submission job");

        let mut results = stream::iter(chunk_ids)
            .map(|chunk| {
                let chunks = Arc::clone(&self.chunks);
                let generator = Arc::clone(&self.generator);
                recommend_chunk(chunks, generator, chunk)
            })
            .buffered(self.concurrency);

        while let Some(result) = results.next().await {
            let recommendations = match result? {
                Some(recommendations) => recommendations,
                None => {
                    stats.chunks_malformed += 1;
                    continue;
                }
            };

            let mut body = String::new();
            for rec in &recommendations {
                write_recommendation(&mut body, rec);
                stats.sessions += 1;
                if rec.clicks.len() < limit {
                    stats.short_click_lists += 1;
                }
                if rec.carts.len() < limit {
                    stats.short_cart_lists += 1;
                }
            }
            writer.write_all(body.as_bytes()).await?;
            stats.chunks_processed += 1;
        }

        stats.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            chunks = stats.chunks_processed,
            malformed = stats.chunks_malformed,
            sessions = stats.sessions,
            short_click_lists = stats.short_click_lists,
            short_cart_lists = stats.short_cart_lists,
            duration_ms = stats.duration_ms,
            "Submission job completed"
        );
        Ok(stats)
    }
}

/// Recommendations for every session of one chunk; `None` for a malformed chunk
async fn recommend_chunk(
    chunks: Arc<dyn ChunkSource>,
    generator: Arc<CandidateGenerator>,
    chunk: String,
) -> Result<Option<Vec<SessionRecommendation>>> {
    let records: Vec<EventRecord> = match chunks.load_chunk(&chunk).await {
        Ok(records) => records,
        Err(AppError::MalformedChunk { chunk, reason }) => {
            warn!(chunk = %chunk, reason = %reason, "Skipping malformed test chunk");
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    let recommendations = tokio::task::spawn_blocking(move || {
        group_sessions(records)
            .iter()
            .map(|session| generator.recommend(&session.history()))
            .collect::<Vec<_>>()
    })
    .await?;

    Ok(Some(recommendations))
}

pub fn format_labels(items: &[ItemId]) -> String {
    let mut out = String::with_capacity(items.len() * 8);
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{}", item);
    }
    out
}

/// Append the three submission lines of one session to `out`
pub fn write_recommendation(out: &mut String, rec: &SessionRecommendation) {
    for (task, items) in [
        ("clicks", &rec.clicks),
        ("carts", &rec.carts),
        ("orders", &rec.orders),
    ] {
        let _ = writeln!(out, "{}_{},{}", rec.session_id, task, format_labels(items));
    }
}

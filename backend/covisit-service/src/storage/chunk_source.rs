use super::ChunkSource;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use event_schema::EventRecord;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

const CHUNK_EXTENSION: &str = "jsonl";

/// Directory of JSON-lines chunks, one `EventRecord` per line
#[derive(Debug, Clone)]
pub struct JsonlChunkSource {
    dir: PathBuf,
}

impl JsonlChunkSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

/// Decode a chunk body. Blank lines are ignored; any other undecodable line
/// rejects the whole chunk.
pub(crate) fn parse_chunk(chunk: &str, body: &str) -> Result<Vec<EventRecord>> {
    body.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(line_no, line)| {
            serde_json::from_str::<EventRecord>(line).map_err(|e| AppError::MalformedChunk {
                chunk: chunk.to_string(),
                reason: format!("line {}: {}", line_no + 1, e),
            })
        })
        .collect()
}

#[async_trait]
impl ChunkSource for JsonlChunkSource {
    async fn list_chunks(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut chunks = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(CHUNK_EXTENSION) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                chunks.push(name.to_string());
            }
        }

        chunks.sort();
        debug!(dir = %self.dir.display(), chunks = chunks.len(), "Listed event chunks");
        Ok(chunks)
    }

    async fn load_chunk(&self, chunk: &str) -> Result<Vec<EventRecord>> {
        let body = tokio::fs::read_to_string(self.dir.join(chunk)).await?;
        parse_chunk(chunk, &body)
    }
}

/// In-memory chunks, listed in name order
#[derive(Debug, Clone, Default)]
pub struct MemoryChunkSource {
    chunks: BTreeMap<String, Vec<EventRecord>>,
}

impl MemoryChunkSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk(mut self, name: impl Into<String>, records: Vec<EventRecord>) -> Self {
        self.chunks.insert(name.into(), records);
        self
    }
}

#[async_trait]
impl ChunkSource for MemoryChunkSource {
    async fn list_chunks(&self) -> Result<Vec<String>> {
        Ok(self.chunks.keys().cloned().collect())
    }

    async fn load_chunk(&self, chunk: &str) -> Result<Vec<EventRecord>> {
        self.chunks
            .get(chunk)
            .cloned()
            .ok_or_else(|| AppError::Internal(format!("unknown chunk {}", chunk)))
    }
}

//! Collaborator interfaces: where event chunks come from and where Top-K
//! tables are kept. The build and serving paths only see the traits.
mod chunk_source;
mod table_store;

use crate::error::Result;
use crate::models::{GraphKind, TopKTable};
use async_trait::async_trait;
use event_schema::EventRecord;

pub use chunk_source::{JsonlChunkSource, MemoryChunkSource};
pub use table_store::{JsonTableStore, MemoryTableStore};

/// Source of raw event chunks
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChunkSource: Send + Sync {
    /// Chunk identifiers in processing order
    async fn list_chunks(&self) -> Result<Vec<String>>;

    /// All records of one chunk. Undecodable chunks fail with
    /// `AppError::MalformedChunk`.
    async fn load_chunk(&self, chunk: &str) -> Result<Vec<EventRecord>>;
}

/// Durable key-value storage of compacted tables, keyed by graph kind
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn exists(&self, kind: GraphKind) -> Result<bool>;

    async fn save(&self, table: &TopKTable) -> Result<()>;

    /// Fails with `AppError::TableNotFound` when nothing is stored for `kind`
    async fn load(&self, kind: GraphKind) -> Result<TopKTable>;
}

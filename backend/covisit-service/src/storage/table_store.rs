use super::TableStore;
use crate::error::{AppError, Result};
use crate::models::{GraphKind, TopKTable};
use async_trait::async_trait;
use dashmap::DashMap;
use std::path::PathBuf;
use tracing::info;

/// One JSON file per graph kind: `top_{k}_{kind}.json`
#[derive(Debug, Clone)]
pub struct JsonTableStore {
    dir: PathBuf,
    top_k: usize,
}

impl JsonTableStore {
    pub fn new(dir: impl Into<PathBuf>, top_k: usize) -> Self {
        Self {
            dir: dir.into(),
            top_k,
        }
    }

    pub fn path_for(&self, kind: GraphKind) -> PathBuf {
        self.dir.join(format!("top_{}_{}.json", self.top_k, kind))
    }
}

#[async_trait]
impl TableStore for JsonTableStore {
    async fn exists(&self, kind: GraphKind) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.path_for(kind)).await?)
    }

    async fn save(&self, table: &TopKTable) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(table.kind());
        let tmp_path = path.with_extension("json.tmp");
        let body = serde_json::to_vec(table)?;

        tokio::fs::write(&tmp_path, &body).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        info!(
            kind = %table.kind(),
            rows = table.len(),
            bytes = body.len(),
            path = %path.display(),
            "Table saved"
        );
        Ok(())
    }

    async fn load(&self, kind: GraphKind) -> Result<TopKTable> {
        let path = self.path_for(kind);
        let body = match tokio::fs::read(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::TableNotFound(kind));
            }
            Err(e) => return Err(e.into()),
        };

        let table: TopKTable = serde_json::from_slice(&body).map_err(|e| AppError::InvalidTable {
            kind,
            reason: e.to_string(),
        })?;
        if table.kind() != kind {
            return Err(AppError::InvalidTable {
                kind,
                reason: format!("file holds a {} table", table.kind()),
            });
        }
        table.validate(self.top_k)?;
        Ok(table)
    }
}

/// Tables kept in memory
#[derive(Debug, Default)]
pub struct MemoryTableStore {
    tables: DashMap<GraphKind, TopKTable>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: GraphKind) -> Option<TopKTable> {
        self.tables.get(&kind).map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl TableStore for MemoryTableStore {
    async fn exists(&self, kind: GraphKind) -> Result<bool> {
        Ok(self.tables.contains_key(&kind))
    }

    async fn save(&self, table: &TopKTable) -> Result<()> {
        self.tables.insert(table.kind(), table.clone());
        Ok(())
    }

    async fn load(&self, kind: GraphKind) -> Result<TopKTable> {
        self.get(kind).ok_or(AppError::TableNotFound(kind))
    }
}

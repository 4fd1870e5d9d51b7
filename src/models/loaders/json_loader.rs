use crate::error::SourceError;
use crate::models::document::DocumentRecord;
use crate::models::loaders::DocumentSource;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 从 JSON 文件加载文档列表
///
/// 文件内容为 `[{"paper_id": ..., "doi": "..."}, ...]`
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl DocumentSource for JsonFileSource {
    async fn load(&self) -> Result<Vec<DocumentRecord>, SourceError> {
        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|source| SourceError::Read {
                path: self.path.clone(),
                source,
            })?;

        let records: Vec<DocumentRecord> =
            serde_json::from_str(&content).map_err(|source| SourceError::Parse {
                path: self.path.clone(),
                source,
            })?;

        tracing::debug!(
            "从 {} 加载了 {} 条文档记录",
            self.path.display(),
            records.len()
        );

        Ok(records)
    }

    fn describe(&self) -> String {
        format!("JSON 文件 {}", self.path.display())
    }
}

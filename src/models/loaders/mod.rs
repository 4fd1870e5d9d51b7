//! 文档列表加载
//!
//! 文档列表在运行开始时一次性加载，之后只读。

pub mod json_loader;
pub mod sparql_loader;

pub use json_loader::JsonFileSource;
pub use sparql_loader::SparqlSource;

use crate::config::DocumentSourceConfig;
use crate::error::{ConfigError, SourceError};
use crate::models::document::DocumentRecord;
use async_trait::async_trait;
use std::time::Duration;

/// 文档来源：返回所有带 DOI 的文档
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// 加载完整的文档列表（保持来源顺序）
    async fn load(&self) -> Result<Vec<DocumentRecord>, SourceError>;

    /// 来源描述，仅用于日志
    fn describe(&self) -> String;
}

/// 根据配置创建文档来源
pub fn source_from_config(
    config: &DocumentSourceConfig,
    timeout: Duration,
) -> Result<Box<dyn DocumentSource>, ConfigError> {
    match config {
        DocumentSourceConfig::File { path } => Ok(Box::new(JsonFileSource::new(path))),
        DocumentSourceConfig::Sparql { endpoint, query } => Ok(Box::new(SparqlSource::new(
            endpoint.clone(),
            query.clone(),
            timeout,
        )?)),
    }
}

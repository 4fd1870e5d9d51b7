use crate::error::{ConfigError, SourceError};
use crate::models::document::DocumentRecord;
use crate::models::loaders::DocumentSource;
use crate::utils::logging::body_or_note;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// 通过 SPARQL SELECT 查询知识图谱获取文档列表
///
/// 查询结果需要包含 `paper_id` 和 `doi` 两个变量，缺少任一变量的行会被跳过。
pub struct SparqlSource {
    http: reqwest::Client,
    endpoint: String,
    query: String,
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    results: SparqlBindings,
}

#[derive(Debug, Deserialize)]
struct SparqlBindings {
    bindings: Vec<HashMap<String, SparqlValue>>,
}

#[derive(Debug, Deserialize)]
struct SparqlValue {
    value: String,
}

impl SparqlSource {
    pub fn new(endpoint: String, query: String, timeout: Duration) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::invalid("document_source", e.to_string()))?;

        Ok(Self {
            http,
            endpoint,
            query,
        })
    }
}

#[async_trait]
impl DocumentSource for SparqlSource {
    async fn load(&self) -> Result<Vec<DocumentRecord>, SourceError> {
        debug!("查询 SPARQL 端点 {}", self.endpoint);

        let request_failed = |source: reqwest::Error| SourceError::Request {
            endpoint: self.endpoint.clone(),
            source,
        };

        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("query", self.query.as_str())])
            .header(ACCEPT, "application/sparql-results+json")
            .send()
            .await
            .map_err(request_failed)?;

        let status = response.status();
        if !status.is_success() {
            let body = body_or_note(response.text().await);
            return Err(SourceError::BadResponse {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let results: SparqlResults = response.json().await.map_err(request_failed)?;

        let mut skipped = 0usize;
        let records: Vec<DocumentRecord> = results
            .results
            .bindings
            .into_iter()
            .filter_map(|mut row| {
                match (row.remove("paper_id"), row.remove("doi")) {
                    (Some(id), Some(doi)) => Some(DocumentRecord::new(id.value, doi.value)),
                    _ => {
                        skipped += 1;
                        None
                    }
                }
            })
            .collect();

        if skipped > 0 {
            warn!("⚠️ 跳过了 {} 行缺少 paper_id 或 doi 的查询结果", skipped);
        }

        Ok(records)
    }

    fn describe(&self) -> String {
        format!("SPARQL 端点 {}", self.endpoint)
    }
}

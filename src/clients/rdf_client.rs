/// RDF 微服务客户端
///
/// 封装对 SPARQL 微服务的调用：每个数据类型一个服务地址，
/// 每次调用只发送一次 GET 请求，不做重试。
use crate::config::{Config, PerDataType};
use crate::error::{ConfigError, FetchError};
use crate::models::document::{FetchOutcome, FetchTarget};
use crate::utils::logging::{body_or_note, truncate_text};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, FROM};
use std::time::Duration;
use tracing::{debug, error};

/// 所有服务共用的查询
pub const CONSTRUCT_QUERY: &str = "CONSTRUCT WHERE { ?s ?p ?o. }";

/// 日志中错误响应正文的最大长度
const MAX_LOGGED_BODY: usize = 500;

/// 抓取单个文档的 RDF 数据
///
/// 实现必须可以被并发调用，且不能 panic 以外的方式向上抛出错误：
/// 所有失败都以 [`FetchError`] 返回。
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, target: &FetchTarget) -> FetchOutcome;
}

/// 基于 reqwest 的微服务客户端
pub struct RdfClient {
    http: reqwest::Client,
    services: PerDataType<String>,
    sparql_prefixes: String,
}

impl RdfClient {
    /// 创建新的客户端
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        if let Some(mailto) = &config.mailto {
            let value = HeaderValue::from_str(mailto)
                .map_err(|e| ConfigError::invalid("mailto", e.to_string()))?;
            headers.insert(FROM, value);
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .default_headers(headers)
            .timeout(config.execution.request_timeout())
            .build()
            .map_err(|e| ConfigError::invalid("http_client", e.to_string()))?;

        Ok(Self {
            http,
            services: config.services.clone(),
            sparql_prefixes: config.sparql_prefixes.clone(),
        })
    }

    /// 直接指定服务地址创建（测试和嵌入使用）
    pub fn with_services(
        services: PerDataType<String>,
        sparql_prefixes: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::invalid("http_client", e.to_string()))?;

        Ok(Self {
            http,
            services,
            sparql_prefixes: sparql_prefixes.into(),
        })
    }

    /// 构建请求 URL
    ///
    /// `documentUri`、`documentDoi` 和 `query` 三个参数都做百分号编码
    pub fn build_url(&self, target: &FetchTarget) -> String {
        let endpoint = self.services.get(target.data_type);
        let query = format!("{} {}", self.sparql_prefixes, CONSTRUCT_QUERY);
        let separator = if endpoint.contains('?') { '&' } else { '?' };

        format!(
            "{}{}documentUri={}&documentDoi={}&query={}",
            endpoint,
            separator,
            urlencoding::encode(target.document_uri.as_str()),
            urlencoding::encode(&target.doi),
            urlencoding::encode(&query)
        )
    }

    fn log_failure(target: &FetchTarget, err: &FetchError) {
        let detail = match err {
            FetchError::Http { status, body } => {
                format!("HTTP {}: {}", status, truncate_text(body, MAX_LOGGED_BODY))
            }
            other => other.to_string(),
        };
        error!(
            data_type = %target.data_type,
            document_uri = %target.document_uri,
            doi = %target.doi,
            error_kind = err.kind(),
            "{}: 无法获取 {} 数据 (文档 {}, DOI {}): {}",
            err.kind(),
            target.data_type,
            target.document_uri,
            target.doi,
            detail
        );
    }
}

#[async_trait]
impl Fetcher for RdfClient {
    async fn fetch(&self, target: &FetchTarget) -> FetchOutcome {
        let url = self.build_url(target);
        debug!(
            "抓取 {} 数据: 文档 {}, DOI {}",
            target.data_type, target.document_uri, target.doi
        );

        let result = async {
            let response = self
                .http
                .get(&url)
                .header(ACCEPT, "text/turtle")
                .send()
                .await
                .map_err(|e| FetchError::Network(e.to_string()))?;

            let status = response.status();
            if status.is_client_error() || status.is_server_error() {
                let body = body_or_note(response.text().await);
                return Err(FetchError::Http {
                    status: status.as_u16(),
                    body,
                });
            }

            let body = response
                .text()
                .await
                .map_err(|e| FetchError::Network(e.to_string()))?;
            if body.is_empty() {
                return Err(FetchError::Other(format!(
                    "服务返回 HTTP {} 但响应正文为空",
                    status.as_u16()
                )));
            }
            Ok(body)
        }
        .await;

        if let Err(err) = &result {
            Self::log_failure(target, err);
        }
        result
    }
}

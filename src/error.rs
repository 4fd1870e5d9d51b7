//! 错误类型
//!
//! 按影响范围划分：
//! - [`FetchError`]：单篇文档抓取失败，只计数，不中断整体运行
//! - [`ConfigError`]：配置或参数无效，启动阶段直接退出
//! - [`SourceError`]：无法获取文档列表，启动阶段直接退出
//! - [`AppError`]：应用层汇总错误（含输出文件写入失败）

use std::path::PathBuf;
use thiserror::Error;

/// 单篇文档的抓取错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// 服务返回 4xx / 5xx，保留响应正文用于诊断
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// 传输层失败（DNS、超时、连接被拒绝等）
    #[error("网络错误: {0}")]
    Network(String),

    /// 其他意外错误（记录格式错误、任务 panic 等）
    #[error("意外错误: {0}")]
    Other(String),
}

impl FetchError {
    /// 错误类别名称，用于日志和统计
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Http { .. } => "HttpError",
            FetchError::Network(_) => "NetworkError",
            FetchError::Other(_) => "UnexpectedError",
        }
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("无法读取配置文件 {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("无法解析配置文件 {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("配置项 {key} 无效: {reason}")]
    Invalid { key: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// 文档列表获取错误
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("无法读取文档列表 {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("无法解析文档列表 {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("SPARQL 请求失败 ({endpoint}): {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("SPARQL 端点返回错误响应 ({endpoint}): HTTP {status}: {body}")]
    BadResponse {
        endpoint: String,
        status: u16,
        body: String,
    },
}

/// 应用层错误
#[derive(Debug, Error)]
pub enum AppError {
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    #[error("文档来源错误: {0}")]
    Source(#[from] SourceError),

    #[error("写入输出文件失败 ({path}): {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, AppError>;

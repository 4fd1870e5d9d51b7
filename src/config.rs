//! 程序配置
//!
//! 配置在启动时从 TOML 文件加载一次，之后以只读引用传给各组件。

use crate::error::ConfigError;
use crate::models::document::{DataType, DocumentUri};
use crate::orchestrator::ExecMode;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 程序配置
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// 文档 URI 模板，包含一个 `{id}`（或旧式 `%s`）占位符
    pub document_uri_template: String,
    /// 共享的命名空间前缀声明，同时用于查询和输出文件头部
    pub sparql_prefixes: String,
    /// 日志目录
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// 日志文件是否记录 debug 级别
    #[serde(default)]
    pub debug: bool,
    /// 联系邮箱，作为 `From` 请求头发送
    #[serde(default)]
    pub mailto: Option<String>,
    /// 各数据类型对应的微服务地址
    pub services: PerDataType<String>,
    /// 各数据类型对应的输出文件
    pub output_files: PerDataType<PathBuf>,
    #[serde(default)]
    pub execution: ExecutionConfig,
    pub document_source: DocumentSourceConfig,
}

/// 按数据类型区分的配置项
#[derive(Debug, Clone, Deserialize)]
pub struct PerDataType<T> {
    pub authorships: T,
    pub sdgs: T,
    pub topics: T,
}

impl<T> PerDataType<T> {
    pub fn get(&self, data_type: DataType) -> &T {
        match data_type {
            DataType::Authorships => &self.authorships,
            DataType::Sdgs => &self.sdgs,
            DataType::Topics => &self.topics,
        }
    }
}

/// 执行方式配置
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// 是否并发抓取
    #[serde(default)]
    pub use_parallel: bool,
    /// 并发数
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// 顺序模式下每次成功后的暂停（秒）
    #[serde(default = "default_pause_sequential")]
    pub pause_sequential_secs: f64,
    /// 任一模式下每次失败后的暂停（秒）
    #[serde(default = "default_pause_error")]
    pub pause_error_secs: f64,
    /// 单次请求超时（秒）
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// 并发模式下按输入顺序排列输出片段
    #[serde(default)]
    pub sort_parallel_output: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            use_parallel: false,
            max_workers: default_max_workers(),
            pause_sequential_secs: default_pause_sequential(),
            pause_error_secs: default_pause_error(),
            request_timeout_secs: default_request_timeout(),
            sort_parallel_output: false,
        }
    }
}

impl ExecutionConfig {
    /// 转换为调度模式
    pub fn exec_mode(&self) -> ExecMode {
        let pause_after_error = Duration::from_secs_f64(self.pause_error_secs);
        if self.use_parallel {
            ExecMode::Parallel {
                max_workers: self.max_workers,
                pause_after_error,
                sort_by_input: self.sort_parallel_output,
            }
        } else {
            ExecMode::Sequential {
                pause_after_success: Duration::from_secs_f64(self.pause_sequential_secs),
                pause_after_error,
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// 文档列表来源
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DocumentSourceConfig {
    /// JSON 文件
    File { path: PathBuf },
    /// SPARQL SELECT 查询
    Sparql { endpoint: String, query: String },
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}
fn default_max_workers() -> usize {
    8
}
fn default_pause_sequential() -> f64 {
    0.5
}
fn default_pause_error() -> f64 {
    2.0
}
fn default_request_timeout() -> u64 {
    60
}

impl Config {
    /// 从 TOML 文件加载配置
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }

    /// 解析 TOML 内容，`origin` 仅用于错误信息
    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// 用环境变量覆盖执行参数
    ///
    /// - `OPENALEX_USE_PARALLEL`
    /// - `OPENALEX_MAX_WORKERS`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("OPENALEX_USE_PARALLEL").and_then(|v| v.parse().ok()) {
            self.execution.use_parallel = v;
        }
        if let Some(v) = lookup("OPENALEX_MAX_WORKERS").and_then(|v| v.parse().ok()) {
            self.execution.max_workers = v;
        }
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        for data_type in DataType::ALL {
            let key = format!("services.{}", data_type);
            validate_http_url(&key, self.services.get(data_type))?;

            if self.output_files.get(data_type).as_os_str().is_empty() {
                return Err(ConfigError::invalid(
                    format!("output_files.{}", data_type),
                    "不能为空",
                ));
            }
        }

        let template = &self.document_uri_template;
        let placeholders = template.matches(DocumentUri::PLACEHOLDER).count()
            + template.matches(DocumentUri::LEGACY_PLACEHOLDER).count();
        if placeholders != 1 {
            return Err(ConfigError::invalid(
                "document_uri_template",
                format!(
                    "必须恰好包含一个 {} 或 {} 占位符",
                    DocumentUri::PLACEHOLDER,
                    DocumentUri::LEGACY_PLACEHOLDER
                ),
            ));
        }

        let exec = &self.execution;
        if exec.max_workers == 0 {
            return Err(ConfigError::invalid("execution.max_workers", "必须 >= 1"));
        }
        for (key, value) in [
            ("execution.pause_sequential_secs", exec.pause_sequential_secs),
            ("execution.pause_error_secs", exec.pause_error_secs),
        ] {
            if let Err(e) = Duration::try_from_secs_f64(value) {
                return Err(ConfigError::invalid(
                    key,
                    format!("必须是有限的非负秒数 ({}): {}", value, e),
                ));
            }
        }
        if exec.request_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "execution.request_timeout_secs",
                "必须 >= 1",
            ));
        }

        match &self.document_source {
            DocumentSourceConfig::File { path } if path.as_os_str().is_empty() => Err(
                ConfigError::invalid("document_source.path", "不能为空"),
            ),
            DocumentSourceConfig::Sparql { endpoint, query } => {
                validate_http_url("document_source.endpoint", endpoint)?;
                if query.trim().is_empty() {
                    return Err(ConfigError::invalid("document_source.query", "不能为空"));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    pub fn output_file(&self, data_type: DataType) -> &Path {
        self.output_files.get(data_type)
    }
}

fn validate_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    let url = url::Url::parse(value)
        .map_err(|e| ConfigError::invalid(key, format!("无效的 URL '{}': {}", value, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::invalid(
            key,
            format!("不支持的协议 '{}'", other),
        )),
    }
}

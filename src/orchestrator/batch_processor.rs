//! 批量抓取处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是一次运行的入口，负责把各组件串起来：
//!
//! 1. **应用初始化**：根据配置创建文档来源、微服务客户端和输出服务
//! 2. **加载文档**：一次性获取所有带 DOI 的文档
//! 3. **调度抓取**：委托 [`Dispatcher`] 按配置的模式抓取
//! 4. **写出结果**：委托 [`TurtleWriter`] 合并写入 Turtle 文件
//! 5. **统计汇总**：输出成功/失败数量
//!
//! 单篇文档的失败不会中断运行；只有文档列表获取失败和输出文件写入失败是致命的。

use crate::clients::{Fetcher, RdfClient};
use crate::config::Config;
use crate::error::Result;
use crate::models::document::DataType;
use crate::models::loaders::{source_from_config, DocumentSource};
use crate::orchestrator::dispatcher::Dispatcher;
use crate::progress::ProgressReporter;
use crate::services::TurtleWriter;
use crate::utils::logging::{log_documents_loaded, log_startup, print_final_stats};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// 应用主结构
pub struct App {
    config: Config,
    data_type: DataType,
    source: Box<dyn DocumentSource>,
    dispatcher: Dispatcher,
    writer: TurtleWriter,
}

/// 一次运行的统计
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub data_type: DataType,
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub output_path: PathBuf,
    /// 写入的正文行数（不含前缀块）
    pub lines_written: usize,
}

impl App {
    /// 初始化应用
    pub fn initialize(
        config: Config,
        data_type: DataType,
        progress: Box<dyn ProgressReporter>,
    ) -> Result<Self> {
        let source = source_from_config(
            &config.document_source,
            config.execution.request_timeout(),
        )?;
        let fetcher: Arc<dyn Fetcher> = Arc::new(RdfClient::new(&config)?);

        Ok(Self::with_components(
            config, data_type, source, fetcher, progress,
        ))
    }

    /// 使用指定的组件创建应用
    pub fn with_components(
        config: Config,
        data_type: DataType,
        source: Box<dyn DocumentSource>,
        fetcher: Arc<dyn Fetcher>,
        progress: Box<dyn ProgressReporter>,
    ) -> Self {
        let dispatcher = Dispatcher::new(fetcher, config.document_uri_template.clone(), progress);
        let writer = TurtleWriter::new(config.output_file(data_type));

        Self {
            config,
            data_type,
            source,
            dispatcher,
            writer,
        }
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<RunSummary> {
        let mode = self.config.execution.exec_mode();
        log_startup(self.data_type, &mode);

        let documents = self.source.load().await?;
        log_documents_loaded(documents.len(), &self.source.describe());

        if documents.is_empty() {
            warn!("⚠️ 没有找到带 DOI 的文档，输出文件只包含前缀声明");
        }

        let result = self
            .dispatcher
            .run(&documents, self.data_type, mode)
            .await;

        let lines_written = self
            .writer
            .write(&result.fragments, &self.config.sparql_prefixes)
            .await?;

        let summary = RunSummary {
            data_type: self.data_type,
            total: documents.len(),
            success: result.success_count(),
            failed: result.error_count,
            output_path: self.writer.output_path().to_path_buf(),
            lines_written,
        };

        print_final_stats(
            summary.data_type,
            summary.success,
            summary.failed,
            &summary.output_path,
        );

        Ok(summary)
    }
}

//! # OpenAlex Article Data
//!
//! 从 SPARQL 微服务获取带 DOI 文档的三类 OpenAlex 元数据
//! （authorships、sdgs、topics），合并写入一个 Turtle 文件。
//!
//! ## 架构设计
//!
//! ### ① 数据层（Models）
//! - `models/document` - 文档记录、文档 URI、抓取目标
//! - `models/loaders` - 文档列表来源（JSON 文件 / SPARQL 查询）
//!
//! ### ② 客户端层（Clients）
//! - `RdfClient` - 对单个文档发起一次 CONSTRUCT 查询，不重试
//!
//! ### ③ 业务能力层（Services）
//! - `TurtleWriter` - 合并 Turtle 片段，前缀块只写一次
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/dispatcher` - 顺序 / 并发调度，统计失败
//! - `orchestrator/batch_processor` - 一次运行的完整流程
//!
//! ## 模块结构

pub mod cli;
pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use clients::{Fetcher, RdfClient};
pub use config::Config;
pub use error::{AppError, FetchError, Result};
pub use models::{DataType, DocumentRecord, FetchTarget};
pub use orchestrator::{AggregateResult, App, Dispatcher, ExecMode, RunSummary};
pub use services::TurtleWriter;
pub use utils::RunLogger;

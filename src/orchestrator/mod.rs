//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 一次运行
//! - 根据配置组装文档来源、客户端、输出服务
//! - 加载文档列表、调度抓取、写出结果、输出统计
//!
//! ### `dispatcher` - 抓取调度
//! - 顺序或并发地为每篇文档调用一次客户端
//! - 收集成功片段，统计失败，控制请求节奏
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (一次运行)
//!     ↓
//! dispatcher (处理 Vec<DocumentRecord>)
//!     ↓
//! clients::RdfClient (处理单个 FetchTarget)
//!     ↓
//! services::TurtleWriter (合并写出)
//! ```

pub mod batch_processor;
pub mod dispatcher;

pub use batch_processor::{App, RunSummary};
pub use dispatcher::{AggregateResult, Dispatcher, ExecMode};

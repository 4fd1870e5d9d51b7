//! 抓取进度报告
//!
//! 进度输出到 **stderr**，stdout 留给日志。

use crate::models::document::DataType;
use std::io::Write;

/// 一次进度事件
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressEvent {
    /// 开始抓取，总数已知
    Started { data_type: DataType, total: usize },
    /// 已完成 n 篇（含失败）
    Advanced {
        data_type: DataType,
        n: usize,
        total: usize,
        errors: usize,
    },
}

/// 进度报告器，由调度器在每篇文档完成后调用
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// 人类可读的进度："topics  1,234 / 5,000 documents  (3 errors)"
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Started { data_type, total } => {
                format!("{}  starting  {} documents\n", data_type, format_number(*total))
            }
            ProgressEvent::Advanced {
                data_type,
                n,
                total,
                errors,
            } => format!(
                "{}  {} / {} documents  ({} errors)\n",
                data_type,
                format_number(*n),
                format_number(*total),
                format_number(*errors)
            ),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// 机器可读的进度：每行一个 JSON 对象
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let obj = match &event {
            ProgressEvent::Started { data_type, total } => serde_json::json!({
                "event": "progress",
                "data_type": data_type,
                "phase": "starting",
                "total": total
            }),
            ProgressEvent::Advanced {
                data_type,
                n,
                total,
                errors,
            } => serde_json::json!({
                "event": "progress",
                "data_type": data_type,
                "phase": "fetching",
                "n": n,
                "total": total,
                "errors": errors
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// 关闭进度输出
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// 进度模式
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    /// stderr 是终端时输出人类可读进度，否则关闭
    Auto,
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// 解析 `Auto`
    pub fn resolve(self) -> Self {
        match self {
            ProgressMode::Auto if atty::is(atty::Stream::Stderr) => ProgressMode::Human,
            ProgressMode::Auto => ProgressMode::Off,
            other => other,
        }
    }

    pub fn reporter(self) -> Box<dyn ProgressReporter> {
        match self.resolve() {
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
            ProgressMode::Off | ProgressMode::Auto => Box::new(NoProgress),
        }
    }
}

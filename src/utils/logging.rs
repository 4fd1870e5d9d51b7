/// 日志工具模块
///
/// - [`RunLogger`]：一次运行的日志上下文（控制台 + 带时间戳的日志文件）
/// - 运行报告：启动信息、文档数量、最终统计
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::level_filters::LevelFilter;
use tracing::{info, Dispatch};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::models::document::DataType;
use crate::orchestrator::ExecMode;

/// 日志文件句柄，可在多个线程间共享
#[derive(Clone)]
struct SharedLogFile(Arc<Mutex<LineWriter<File>>>);

impl SharedLogFile {
    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, LineWriter<File>>> {
        self.0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "日志文件锁已损坏"))
    }
}

impl Write for SharedLogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock()?.flush()
    }
}

/// 一次运行的日志上下文
///
/// 不安装全局 subscriber：调用方通过 [`RunLogger::dispatch`] 显式地把
/// 日志上下文交给需要记录日志的 future（`WithSubscriber`），运行结束后
/// 调用 [`RunLogger::close`] 刷新日志文件。
pub struct RunLogger {
    dispatch: Dispatch,
    log_file: PathBuf,
    file: SharedLogFile,
}

impl RunLogger {
    /// 打开日志上下文
    ///
    /// # 参数
    /// - `log_dir`: 日志目录，不存在时自动创建
    /// - `log_prefix`: 日志文件名前缀
    /// - `debug`: 日志文件是否记录 debug 级别
    ///
    /// 控制台级别由 `RUST_LOG` 控制，默认 `info`。
    pub fn open(log_dir: &Path, log_prefix: &str, debug: bool) -> Result<Self> {
        fs::create_dir_all(log_dir)
            .with_context(|| format!("无法创建日志目录: {}", log_dir.display()))?;

        let log_file = log_dir.join(format!(
            "{}_{}.log",
            log_prefix,
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        ));
        let file = File::create(&log_file)
            .with_context(|| format!("无法创建日志文件: {}", log_file.display()))?;
        let file = SharedLogFile(Arc::new(Mutex::new(LineWriter::new(file))));

        let console_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let file_level = if debug {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        };

        let writer = file.clone();
        let subscriber = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_filter(console_filter),
            )
            .with(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(move || writer.clone())
                    .with_filter(file_level),
            );

        Ok(Self {
            dispatch: Dispatch::new(subscriber),
            log_file,
            file,
        })
    }

    /// 日志上下文，交给 `WithSubscriber::with_subscriber` 使用
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// 本次运行的日志文件路径
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// 关闭日志上下文并刷新日志文件
    pub fn close(mut self) -> Result<()> {
        self.file
            .flush()
            .with_context(|| format!("无法写入日志文件: {}", self.log_file.display()))
    }
}

/// 记录程序启动信息
pub fn log_startup(data_type: DataType, mode: &ExecMode) {
    info!("{}", "=".repeat(60));
    info!("🚀 开始获取 OpenAlex {} 数据", data_type);
    match mode {
        ExecMode::Parallel { max_workers, .. } => {
            info!("📊 并发模式，最大并发数: {}", max_workers)
        }
        ExecMode::Sequential { .. } => info!("📊 顺序执行模式"),
    }
    info!("{}", "=".repeat(60));
}

/// 记录文档列表加载信息
pub fn log_documents_loaded(total: usize, source: &str) {
    info!("✓ 从{}加载了 {} 篇带 DOI 的文档", source, total);
}

/// 打印最终统计信息
///
/// # 参数
/// - `data_type`: 数据类型
/// - `success`: 成功数量
/// - `failed`: 失败数量
/// - `output_path`: 输出文件路径
pub fn print_final_stats(data_type: DataType, success: usize, failed: usize, output_path: &Path) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("{} 数据已保存至: {}", data_type, output_path.display());
    info!("✅ 成功: {}/{}", success, success + failed);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（字符数）
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

/// 错误响应的正文，读取失败时用一条说明代替
pub fn body_or_note<E: std::fmt::Display>(body: std::result::Result<String, E>) -> String {
    body.unwrap_or_else(|e| format!("<响应正文无法读取: {}>", e))
}

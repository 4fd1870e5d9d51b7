//! Turtle 合并写入服务 - 业务能力层
//!
//! 只负责把多个 Turtle 片段合并成一个文件：
//! 共享前缀块写一次，各片段自己的 `@prefix` 行全部去掉。
//! 不解析 RDF，不去重三元组。

use crate::error::AppError;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// 片段中需要去掉的行前缀
const PREFIX_DIRECTIVE: &str = "@prefix";

/// Turtle 合并写入服务
pub struct TurtleWriter {
    output_path: PathBuf,
}

impl TurtleWriter {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// 合并片段并写入任意输出
    ///
    /// # 参数
    /// - `writer`: 输出目标
    /// - `fragments`: 各文档的原始 Turtle 文本
    /// - `prefix_block`: 共享前缀块，原样写在最前面
    ///
    /// # 返回
    /// 写入的正文行数（不含前缀块）
    pub fn aggregate<W: Write>(
        writer: &mut W,
        fragments: &[String],
        prefix_block: &str,
    ) -> io::Result<usize> {
        writer.write_all(prefix_block.as_bytes())?;

        let mut lines_written = 0;
        for fragment in fragments {
            for line in fragment.lines() {
                if line.starts_with(PREFIX_DIRECTIVE) {
                    continue;
                }
                writer.write_all(line.as_bytes())?;
                writer.write_all(b"\n")?;
                lines_written += 1;
            }
        }

        Ok(lines_written)
    }

    /// 合并片段并覆盖写入输出文件
    ///
    /// 父目录不存在时自动创建；已有文件会被整体替换。
    pub async fn write(&self, fragments: &[String], prefix_block: &str) -> Result<usize, AppError> {
        let output_error = |source: io::Error| AppError::Output {
            path: self.output_path.clone(),
            source,
        };

        let mut buffer = Vec::new();
        let lines_written = Self::aggregate(&mut buffer, fragments, prefix_block)
            .map_err(output_error)?;

        if let Some(parent) = self.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(output_error)?;
            }
        }
        tokio::fs::write(&self.output_path, &buffer)
            .await
            .map_err(output_error)?;

        debug!(
            "写入 {} 个片段共 {} 行到 {}",
            fragments.len(),
            lines_written,
            self.output_path.display()
        );

        Ok(lines_written)
    }
}

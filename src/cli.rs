//! 命令行参数

use crate::models::document::DataType;
use crate::progress::ProgressMode;
use clap::Parser;
use std::path::PathBuf;

/// 从 OpenAlex SPARQL 微服务获取文档的三类元数据：authorships、sdgs、topics
#[derive(Debug, Parser)]
#[command(name = "openalex_article_data", version)]
pub struct Cli {
    /// 配置文件路径（TOML）
    pub config_file: PathBuf,

    /// 要获取的数据类型
    #[arg(long = "datatype", value_enum)]
    pub data_type: DataType,

    /// 进度输出方式（输出到 stderr）
    #[arg(long, value_enum, default_value = "auto")]
    pub progress: ProgressMode,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::try_parse_from(["openalex_article_data", "cfg.toml", "--datatype", "sdgs"])
            .unwrap();
        assert_eq!(cli.config_file, PathBuf::from("cfg.toml"));
        assert_eq!(cli.data_type, DataType::Sdgs);
        assert_eq!(cli.progress, ProgressMode::Auto);
    }

    #[test]
    fn test_datatype_is_required() {
        let err = Cli::try_parse_from(["openalex_article_data", "cfg.toml"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_unknown_datatype_rejected() {
        let err = Cli::try_parse_from([
            "openalex_article_data",
            "cfg.toml",
            "--datatype",
            "authors",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
    }

    #[test]
    fn test_config_file_is_required() {
        let err =
            Cli::try_parse_from(["openalex_article_data", "--datatype", "topics"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_progress_mode() {
        let cli = Cli::try_parse_from([
            "openalex_article_data",
            "cfg.toml",
            "--datatype",
            "topics",
            "--progress",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.progress, ProgressMode::Json);
    }
}

use anyhow::{Context, Result};
use clap::Parser;
use openalex_article_data::cli::Cli;
use openalex_article_data::{App, Config, RunLogger};
use tracing::instrument::WithSubscriber;
use tracing::{dispatcher, error};

const LOG_PREFIX: &str = "retrieve_article_data";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = Config::from_file(&cli.config_file)
        .with_context(|| format!("无法加载配置: {}", cli.config_file.display()))?;

    // 初始化日志
    let logger = RunLogger::open(&config.log_dir, LOG_PREFIX, config.debug)?;

    let data_type = cli.data_type;
    let progress = cli.progress.reporter();

    // 初始化并运行应用
    let outcome = async move { App::initialize(config, data_type, progress)?.run().await }
        .with_subscriber(logger.dispatch().clone())
        .await;

    if let Err(e) = &outcome {
        dispatcher::with_default(logger.dispatch(), || error!("❌ 运行失败: {}", e));
    }
    logger.close()?;

    outcome.map(|_| ()).map_err(Into::into)
}

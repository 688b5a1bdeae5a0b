//! Stock Insights CLI
//!
//! Answers questions about stocks from news and price data.

mod commands;

use clap::{Parser, Subcommand};
use commands::{NewsCommand, RecordsCommand, StatsCommand, StockCommand, SyncCommand};
use insights_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;
use tracing::Instrument;

/// Stock Insights - questions over stock news and price data
#[derive(Parser, Debug)]
#[command(name = "insights")]
#[command(about = "Answer questions about stocks from news and price data", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "INSIGHTS_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "INSIGHTS_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider
    #[arg(short, long, global = true, env = "INSIGHTS_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "LLM_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question answered from news
    News(NewsCommand),

    /// Ask a question answered from price data
    Stock(StockCommand),

    /// Index records that are not yet searchable
    Sync(SyncCommand),

    /// Manage stored news records
    Records(RecordsCommand),

    /// Show record and index statistics
    Stats(StatsCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::News(_) => "news",
            Commands::Stock(_) => "stock",
            Commands::Sync(_) => "sync",
            Commands::Records(_) => "records",
            Commands::Stats(_) => "stats",
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = AppConfig::load()?.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;
    config.validate()?;

    tracing::info!("Stock Insights CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!(provider = %config.llm.provider, model = %config.llm.model, "Inference backend");

    config.ensure_insights_dir()?;

    let command_name = cli.command.name();
    let span = tracing::info_span!("command", name = command_name);

    let result = async {
        match cli.command {
            Commands::News(cmd) => cmd.execute(&config).await,
            Commands::Stock(cmd) => cmd.execute(&config).await,
            Commands::Sync(cmd) => cmd.execute(&config).await,
            Commands::Records(cmd) => cmd.execute(&config).await,
            Commands::Stats(cmd) => cmd.execute(&config).await,
        }
    }
    .instrument(span)
    .await;

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}

//! Stock command handler.
//!
//! Answers questions from price data through generated SQL.

use clap::{Args, Subcommand};
use insights_core::{config::AppConfig, AppError, AppResult};
use insights_workflow::{price_stats_question, Backends, StockQueryState};

/// Ask a question answered from price data
#[derive(Args, Debug)]
#[command(args_conflicts_with_subcommands = true)]
pub struct StockCommand {
    #[command(subcommand)]
    pub action: Option<StockAction>,

    /// The question to answer
    pub question: Option<String>,

    /// Output the final state and step trace as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum StockAction {
    /// Aggregate a price column over recent days
    PriceStats(PriceStatsCommand),
}

/// Aggregate a price column over recent days
#[derive(Args, Debug)]
pub struct PriceStatsCommand {
    /// Ticker symbol (e.g. RELIANCE.NS)
    pub ticker: String,

    /// Aggregate to compute (e.g. average, maximum, minimum)
    #[arg(long, default_value = "average")]
    pub operation: String,

    /// Price column (open, high, low, close)
    #[arg(long, default_value = "close")]
    pub price_type: String,

    /// Number of days to look back
    #[arg(long, default_value = "7")]
    pub days: u32,

    /// Output the final state and step trace as JSON
    #[arg(long)]
    pub json: bool,
}

impl StockCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let (question, json) = match (&self.action, &self.question) {
            (Some(StockAction::PriceStats(stats)), _) => (
                price_stats_question(
                    &stats.ticker,
                    &stats.operation,
                    &stats.price_type,
                    stats.days,
                ),
                stats.json,
            ),
            (None, Some(question)) => (question.clone(), self.json),
            (None, None) => {
                return Err(AppError::Config(
                    "A question or the price-stats subcommand is required".to_string(),
                ))
            }
        };

        tracing::info!("Executing stock command");
        ask(config, question, json).await
    }
}

async fn ask(config: &AppConfig, question: String, json: bool) -> AppResult<()> {
    let backends = Backends::new(config.clone());
    let workflow = backends.stock_workflow().await?;

    let run = workflow.invoke(StockQueryState::new(question)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&run)?);
        return Ok(());
    }

    println!("{}", run.state.answer.as_deref().unwrap_or_default());

    if let Some(error) = &run.state.error {
        eprintln!(
            "Query still failing after {} retries: {}",
            run.state.retry_count, error
        );
    }

    Ok(())
}

//! Records command handler.
//!
//! Inserts news records the way a scraper would, then syncs them.

use super::sync::print_outcome;
use clap::{Args, Subcommand};
use insights_core::{config::AppConfig, AppResult};
use insights_knowledge::{NewRecord, RecordStore};
use insights_workflow::Backends;

const SCRAPER_ORIGIN: &str = "scraper";

/// Manage stored news records
#[derive(Args, Debug)]
pub struct RecordsCommand {
    #[command(subcommand)]
    pub action: RecordsAction,
}

#[derive(Subcommand, Debug)]
pub enum RecordsAction {
    /// Store a news record
    Add(RecordsAddCommand),
}

/// Store a news record
#[derive(Args, Debug)]
pub struct RecordsAddCommand {
    /// Ticker the news is about
    #[arg(long)]
    pub ticker: String,

    /// Article text
    #[arg(long)]
    pub content: String,

    /// Article link
    #[arg(long)]
    pub source: Option<String>,

    /// Article title
    #[arg(long)]
    pub title: Option<String>,

    /// Store only, leave indexing to a later sync
    #[arg(long)]
    pub no_sync: bool,
}

impl RecordsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            RecordsAction::Add(cmd) => cmd.execute(config).await,
        }
    }
}

impl RecordsAddCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!(ticker = %self.ticker, "Executing records add command");

        let backends = Backends::new(config.clone());
        let store = backends.record_store()?;

        let mut record = NewRecord::new(self.content.as_str(), SCRAPER_ORIGIN)
            .with_ticker(self.ticker.as_str());
        if let Some(source) = &self.source {
            record = record.with_link(source.as_str());
        }
        if let Some(title) = &self.title {
            record = record.with_title(title.as_str());
        }

        let id = store.insert(&record)?;
        println!("Stored record {}", id);

        if !self.no_sync {
            let outcome = backends.sync_manager().await?.sync().await?;
            print_outcome(&outcome);
        }

        Ok(())
    }
}

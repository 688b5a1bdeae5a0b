//! Sync command handler.

use clap::Args;
use insights_core::{config::AppConfig, AppResult};
use insights_knowledge::SyncOutcome;
use insights_workflow::Backends;

/// Index records that are not yet searchable
#[derive(Args, Debug)]
pub struct SyncCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SyncCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing sync command");

        let backends = Backends::new(config.clone());
        let outcome = backends.sync_manager().await?.sync().await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        } else {
            print_outcome(&outcome);
        }

        Ok(())
    }
}

pub fn print_outcome(outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::NothingToSync => println!("Nothing to sync"),
        SyncOutcome::Synced {
            records,
            chunks,
            marked,
        } => println!(
            "Synced {} records ({} chunks), {} marked",
            records, chunks, marked
        ),
        SyncOutcome::StorageFailed { records, reason } => println!(
            "Index storage failed, {} records left for the next sync: {}",
            records, reason
        ),
    }
}

//! Stats command handler.

use clap::Args;
use insights_core::{config::AppConfig, AppResult};
use insights_knowledge::{RecordStore, SqliteVectorIndex, VectorIndex};
use insights_workflow::Backends;

/// Show record and index statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let counts = Backends::new(config.clone()).record_store()?.counts()?;

        let index = match SqliteVectorIndex::open_existing(
            config.index_path(),
            config.storage.collection.as_str(),
        ) {
            Ok(index) => Some(index.stats()?),
            Err(e) => {
                tracing::debug!("No index to report on: {}", e);
                None
            }
        };

        if self.json {
            let output = serde_json::json!({
                "records": counts.total,
                "unsynced": counts.unsynced,
                "index": index,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!("Records:   {} ({} unsynced)", counts.total, counts.unsynced);
        match index {
            Some(stats) => println!(
                "Index:     {} entries from {} records in '{}'",
                stats.entries, stats.records, stats.collection
            ),
            None => println!("Index:     not built yet (run `insights sync`)"),
        }

        Ok(())
    }
}

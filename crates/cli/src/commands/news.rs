//! News command handler.

use clap::Args;
use insights_core::{config::AppConfig, AppResult};
use insights_workflow::{Backends, NewsState};

/// Ask a question answered from news
#[derive(Args, Debug)]
pub struct NewsCommand {
    /// The question to answer
    pub question: String,

    /// Ticker the question is about (e.g. RELIANCE.NS)
    #[arg(short, long)]
    pub ticker: Option<String>,

    /// Output the final state and step trace as JSON
    #[arg(long)]
    pub json: bool,
}

impl NewsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!(ticker = ?self.ticker, "Executing news command");

        let backends = Backends::new(config.clone());
        let workflow = backends.news_workflow().await?;

        let mut state = NewsState::new(self.question.as_str());
        if let Some(ticker) = &self.ticker {
            state = state.with_ticker(ticker.as_str());
        }

        let run = workflow.invoke(state).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&run)?);
            return Ok(());
        }

        println!("{}", run.state.answer.as_deref().unwrap_or_default());

        let sources: Vec<&str> = run
            .state
            .documents
            .iter()
            .filter_map(|d| d.source.as_deref())
            .collect();
        if !sources.is_empty() {
            println!();
            println!("Sources:");
            for source in sources {
                println!("  - {}", source);
            }
        }

        Ok(())
    }
}

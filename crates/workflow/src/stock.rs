//! Structured-query workflow.
//!
//! ```text
//! GenerateQuery -> Execute -> (GenerateQuery | Answer) -> End
//! ```
//!
//! A failed execution loops back to query generation with the engine's
//! error until `max_retries` loops have been taken.

use crate::executor::{QueryExecutor, QueryRows};
use crate::inference::PromptRunner;
use crate::run::WorkflowRun;
use crate::sql::prepare_sql;
use insights_core::{AppError, AppResult};
use insights_prompt::catalog;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockQueryState {
    pub question: String,
    pub generated_query: Option<String>,
    pub result_rows: Option<QueryRows>,
    pub error: Option<String>,
    pub retry_count: u32,
    pub answer: Option<String>,
}

impl StockQueryState {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStep {
    GenerateQuery,
    Execute,
    Answer,
    End,
}

impl fmt::Display for StockStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StockStep::GenerateQuery => "generate_query",
            StockStep::Execute => "execute",
            StockStep::Answer => "answer",
            StockStep::End => "end",
        };
        f.write_str(name)
    }
}

/// The step after `step` given the state it left behind.
pub fn next_step(step: StockStep, state: &StockQueryState, max_retries: u32) -> StockStep {
    match step {
        StockStep::GenerateQuery => StockStep::Execute,
        StockStep::Execute if state.error.is_some() && state.retry_count < max_retries => {
            StockStep::GenerateQuery
        }
        StockStep::Execute => StockStep::Answer,
        StockStep::Answer | StockStep::End => StockStep::End,
    }
}

/// Question phrasing for an aggregate over a price column.
pub fn price_stats_question(ticker: &str, operation: &str, price_type: &str, days: u32) -> String {
    format!(
        "What is the {} value of {} for '{}' over last {} day(s) ?",
        operation, price_type, ticker, days
    )
}

/// Natural language to SQL, with self-correction on execution errors.
pub struct StockQueryWorkflow {
    runner: PromptRunner,
    executor: Arc<dyn QueryExecutor>,
    max_retries: u32,
}

impl StockQueryWorkflow {
    pub fn new(runner: PromptRunner, executor: Arc<dyn QueryExecutor>) -> Self {
        Self {
            runner,
            executor,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Run the state machine to completion.
    pub async fn invoke(
        &self,
        state: StockQueryState,
    ) -> AppResult<WorkflowRun<StockQueryState, StockStep>> {
        let run_id = Uuid::new_v4();
        self.run_steps(run_id, state)
            .instrument(tracing::info_span!("stock_workflow", %run_id))
            .await
    }

    async fn run_steps(
        &self,
        run_id: Uuid,
        mut state: StockQueryState,
    ) -> AppResult<WorkflowRun<StockQueryState, StockStep>> {
        if state.question.trim().is_empty() {
            return Err(AppError::Workflow(
                "Cannot enter generate_query: question is empty".to_string(),
            ));
        }

        let mut trace = Vec::new();
        let mut step = StockStep::GenerateQuery;

        while step != StockStep::End {
            trace.push(step);
            tracing::info!(step = %step, retry_count = state.retry_count, "Entering step");

            match step {
                StockStep::GenerateQuery => self.generate_query(&mut state).await?,
                StockStep::Execute => self.execute(&mut state).await,
                StockStep::Answer => self.answer(&mut state).await?,
                StockStep::End => {}
            }

            let next = next_step(step, &state, self.max_retries);
            if step == StockStep::Execute && next == StockStep::GenerateQuery {
                state.retry_count += 1;
            }
            tracing::info!(from = %step, to = %next, retry_count = state.retry_count, "Transition");
            step = next;
        }
        trace.push(StockStep::End);

        Ok(WorkflowRun::new(run_id, state, trace))
    }

    async fn generate_query(&self, state: &mut StockQueryState) -> AppResult<()> {
        let error = state.error.as_deref().unwrap_or_default();
        let previous = state.generated_query.as_deref().unwrap_or_default();

        let raw = self
            .runner
            .run(
                catalog::SQL_GENERATION,
                &[
                    ("question", state.question.as_str()),
                    ("error", error),
                    ("previous_query", previous),
                ],
            )
            .await?;

        let sql = prepare_sql(&raw);
        tracing::info!(sql = %sql, "Generated query");
        state.generated_query = Some(sql);
        Ok(())
    }

    async fn execute(&self, state: &mut StockQueryState) {
        let sql = state.generated_query.as_deref().unwrap_or_default();

        match self.executor.execute(sql).await {
            Ok(rows) => {
                tracing::info!(rows = rows.len(), "Query succeeded");
                state.result_rows = Some(rows);
                state.error = None;
            }
            Err(e) => {
                let message = match e {
                    AppError::Query(message) => message,
                    other => other.to_string(),
                };
                tracing::warn!(error = %message, "Query failed");
                state.result_rows = None;
                state.error = Some(message);
            }
        }
    }

    async fn answer(&self, state: &mut StockQueryState) -> AppResult<()> {
        let context = match &state.result_rows {
            Some(rows) => serde_json::to_string_pretty(rows)?,
            None => match &state.error {
                Some(error) => format!("No data available. Last query error: {}", error),
                None => "No data available.".to_string(),
            },
        };

        let answer = self
            .runner
            .run(
                catalog::STOCK_ANSWER,
                &[("context", context.as_str()), ("question", state.question.as_str())],
            )
            .await?;

        state.answer = Some(answer.trim().to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_loops_back_until_bound() {
        let mut state = StockQueryState::new("avg close");
        state.error = Some("syntax error".to_string());

        for retry_count in 0..3 {
            state.retry_count = retry_count;
            assert_eq!(
                next_step(StockStep::Execute, &state, 3),
                StockStep::GenerateQuery
            );
        }

        state.retry_count = 3;
        assert_eq!(next_step(StockStep::Execute, &state, 3), StockStep::Answer);
    }

    #[test]
    fn test_success_goes_to_answer() {
        let state = StockQueryState::new("avg close");
        assert_eq!(next_step(StockStep::Execute, &state, 3), StockStep::Answer);
        assert_eq!(next_step(StockStep::GenerateQuery, &state, 3), StockStep::Execute);
        assert_eq!(next_step(StockStep::Answer, &state, 3), StockStep::End);
    }

    #[test]
    fn test_zero_retries_never_loops() {
        let mut state = StockQueryState::new("avg close");
        state.error = Some("boom".to_string());
        assert_eq!(next_step(StockStep::Execute, &state, 0), StockStep::Answer);
    }

    #[test]
    fn test_price_stats_question() {
        assert_eq!(
            price_stats_question("RELIANCE.NS", "average", "close", 7),
            "What is the average value of close for 'RELIANCE.NS' over last 7 day(s) ?"
        );
    }
}

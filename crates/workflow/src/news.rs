//! News workflow.
//!
//! ```text
//! Retrieve -> Grade -> (WebSearch | Generate)
//! WebSearch -> Generate -> HallucinationCheck -> (WebSearch | End)
//! ```
//!
//! The grounding retry is bounded by `augmentation_attempted`, so a second
//! failed grounding check always ends the run.

use crate::augment::Augmenter;
use crate::gates::{join_contents, GradingGate, GroundingGate};
use crate::inference::PromptRunner;
use crate::run::WorkflowRun;
use insights_core::{AppError, AppResult};
use insights_knowledge::{Document, Retriever};
use insights_prompt::catalog;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Answer substituted for one the documents do not support.
pub const REFUSAL: &str =
    "I apologize, but there is insufficient information in retrieved documents to answer your question.";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsState {
    pub question: String,
    pub ticker: Option<String>,
    pub documents: Vec<Document>,
    pub needs_augmentation: bool,
    pub answer: Option<String>,
    pub is_grounded: Option<bool>,
    pub augmentation_attempted: bool,
}

impl NewsState {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    pub fn with_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = Some(ticker.into());
        self
    }

    /// Merge the fields a step changed.
    pub fn apply(&mut self, update: NewsUpdate) {
        if let Some(documents) = update.documents {
            self.documents = documents;
        }
        if let Some(needs_augmentation) = update.needs_augmentation {
            self.needs_augmentation = needs_augmentation;
        }
        if let Some(answer) = update.answer {
            self.answer = Some(answer);
        }
        if let Some(is_grounded) = update.is_grounded {
            self.is_grounded = Some(is_grounded);
        }
        if let Some(attempted) = update.augmentation_attempted {
            self.augmentation_attempted = attempted;
        }
    }
}

/// Fields changed by one step.
#[derive(Debug, Default)]
pub struct NewsUpdate {
    pub documents: Option<Vec<Document>>,
    pub needs_augmentation: Option<bool>,
    pub answer: Option<String>,
    pub is_grounded: Option<bool>,
    pub augmentation_attempted: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsStep {
    Retrieve,
    Grade,
    WebSearch,
    Generate,
    HallucinationCheck,
    End,
}

impl fmt::Display for NewsStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NewsStep::Retrieve => "retrieve",
            NewsStep::Grade => "grade",
            NewsStep::WebSearch => "web_search",
            NewsStep::Generate => "generate",
            NewsStep::HallucinationCheck => "hallucination_check",
            NewsStep::End => "end",
        };
        f.write_str(name)
    }
}

/// The step after `step` given the state it left behind.
pub fn next_step(step: NewsStep, state: &NewsState) -> NewsStep {
    match step {
        NewsStep::Retrieve => NewsStep::Grade,
        NewsStep::Grade if state.needs_augmentation && !state.augmentation_attempted => {
            NewsStep::WebSearch
        }
        NewsStep::Grade => NewsStep::Generate,
        NewsStep::WebSearch => NewsStep::Generate,
        NewsStep::Generate => NewsStep::HallucinationCheck,
        NewsStep::HallucinationCheck
            if state.is_grounded == Some(false) && !state.augmentation_attempted =>
        {
            NewsStep::WebSearch
        }
        NewsStep::HallucinationCheck | NewsStep::End => NewsStep::End,
    }
}

/// Check that `state` carries what `step` reads.
pub fn validate_entry(step: NewsStep, state: &NewsState) -> AppResult<()> {
    let problem = match step {
        NewsStep::Retrieve if state.question.trim().is_empty() => Some("question is empty"),
        NewsStep::WebSearch if state.augmentation_attempted => {
            Some("augmentation was already attempted")
        }
        NewsStep::HallucinationCheck if state.answer.is_none() => Some("no answer to check"),
        _ => None,
    };

    match problem {
        Some(problem) => Err(AppError::Workflow(format!(
            "Cannot enter {}: {}",
            step, problem
        ))),
        None => Ok(()),
    }
}

/// Document question answering with grading, augmentation and grounding.
pub struct NewsWorkflow {
    retriever: Arc<dyn Retriever>,
    grader: GradingGate,
    grounding: GroundingGate,
    augmenter: Augmenter,
    runner: PromptRunner,
}

impl NewsWorkflow {
    pub fn new(retriever: Arc<dyn Retriever>, augmenter: Augmenter, runner: PromptRunner) -> Self {
        Self {
            retriever,
            grader: GradingGate::new(runner.clone()),
            grounding: GroundingGate::new(runner.clone()),
            augmenter,
            runner,
        }
    }

    /// Run the state machine to completion.
    pub async fn invoke(&self, state: NewsState) -> AppResult<WorkflowRun<NewsState, NewsStep>> {
        let run_id = Uuid::new_v4();
        self.run_steps(run_id, state)
            .instrument(tracing::info_span!("news_workflow", %run_id))
            .await
    }

    async fn run_steps(
        &self,
        run_id: Uuid,
        mut state: NewsState,
    ) -> AppResult<WorkflowRun<NewsState, NewsStep>> {
        let mut trace = Vec::new();
        let mut step = NewsStep::Retrieve;

        while step != NewsStep::End {
            validate_entry(step, &state)?;
            trace.push(step);
            tracing::info!(step = %step, "Entering step");

            let update = self.execute(step, &state).await?;
            state.apply(update);

            let next = next_step(step, &state);
            tracing::info!(from = %step, to = %next, "Transition");
            step = next;
        }
        trace.push(NewsStep::End);

        Ok(WorkflowRun::new(run_id, state, trace))
    }

    async fn execute(&self, step: NewsStep, state: &NewsState) -> AppResult<NewsUpdate> {
        match step {
            NewsStep::Retrieve => Ok(self.retrieve(state).await),
            NewsStep::Grade => Ok(self.grade(state).await),
            NewsStep::WebSearch => Ok(self.web_search(state).await),
            NewsStep::Generate => self.generate(state).await,
            NewsStep::HallucinationCheck => Ok(self.hallucination_check(state).await),
            NewsStep::End => Ok(NewsUpdate::default()),
        }
    }

    async fn retrieve(&self, state: &NewsState) -> NewsUpdate {
        let documents = match self.retriever.retrieve(&state.question).await {
            Ok(documents) => documents,
            Err(e) => {
                tracing::warn!("Retrieval failed, continuing with no documents: {}", e);
                Vec::new()
            }
        };

        tracing::info!(documents = documents.len(), "Retrieved documents");
        NewsUpdate {
            documents: Some(documents),
            ..Default::default()
        }
    }

    async fn grade(&self, state: &NewsState) -> NewsUpdate {
        let mut relevant = Vec::with_capacity(state.documents.len());

        for (position, document) in state.documents.iter().enumerate() {
            let keep = self.grader.is_relevant(&state.question, document).await;
            tracing::debug!(position, relevant = keep, "Graded document");
            if keep {
                relevant.push(document.clone());
            }
        }

        let needs_augmentation = relevant.is_empty();
        tracing::info!(
            kept = relevant.len(),
            graded = state.documents.len(),
            needs_augmentation,
            "Grading complete"
        );

        NewsUpdate {
            documents: Some(relevant),
            needs_augmentation: Some(needs_augmentation),
            ..Default::default()
        }
    }

    async fn web_search(&self, state: &NewsState) -> NewsUpdate {
        let augmentation = self
            .augmenter
            .augment(&state.question, state.ticker.as_deref())
            .await;

        let mut documents = state.documents.clone();
        if let Some(document) = augmentation.document {
            documents.push(document);
        }

        NewsUpdate {
            documents: Some(documents),
            augmentation_attempted: Some(true),
            ..Default::default()
        }
    }

    async fn generate(&self, state: &NewsState) -> AppResult<NewsUpdate> {
        let context = join_contents(&state.documents);
        let answer = self
            .runner
            .run(
                catalog::NEWS_ANSWER,
                &[("context", context.as_str()), ("question", state.question.as_str())],
            )
            .await?;

        Ok(NewsUpdate {
            answer: Some(answer.trim().to_string()),
            ..Default::default()
        })
    }

    async fn hallucination_check(&self, state: &NewsState) -> NewsUpdate {
        let answer = state.answer.as_deref().unwrap_or_default();
        let grounded = self.grounding.is_grounded(&state.documents, answer).await;
        tracing::info!(grounded, "Grounding check complete");

        NewsUpdate {
            is_grounded: Some(grounded),
            answer: (!grounded).then(|| REFUSAL.to_string()),
            ..Default::default()
        }
    }
}

//! The opaque `prompt -> text` call every step goes through.

use insights_core::{AppError, AppResult};
use insights_llm::{LlmClient, LlmRequest};
use insights_prompt::{build_prompt, catalog, resolve_prompt, BuiltPrompt, PromptDefinition};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Text inference over a fully built prompt.
#[async_trait::async_trait]
pub trait Inference: Send + Sync {
    async fn infer(&self, prompt: &BuiltPrompt) -> AppResult<String>;
}

/// [`Inference`] backed by an [`LlmClient`].
pub struct LlmInference {
    client: Arc<dyn LlmClient>,
    model: String,
    temperature: f32,
}

impl LlmInference {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            client,
            model: model.into(),
            temperature,
        }
    }
}

#[async_trait::async_trait]
impl Inference for LlmInference {
    async fn infer(&self, prompt: &BuiltPrompt) -> AppResult<String> {
        let mut request = LlmRequest::new(prompt.user.as_str(), self.model.as_str())
            .with_temperature(self.temperature);
        if let Some(system) = &prompt.system {
            request = request.with_system(system.as_str());
        }

        tracing::debug!(
            prompt = %prompt.metadata.source_prompt_id,
            provider = self.client.provider_name(),
            "Running inference"
        );

        let response = self.client.complete(&request).await?;
        Ok(response.content)
    }
}

/// The resolved prompt definitions for every inference call site.
#[derive(Debug, Clone)]
pub struct Prompts {
    definitions: HashMap<String, PromptDefinition>,
}

impl Prompts {
    /// Resolve every catalog prompt, honouring workspace overrides.
    pub fn load(workspace: &Path) -> AppResult<Self> {
        let definitions = catalog::builtin_ids()
            .map(|id| resolve_prompt(workspace, id).map(|def| (id.to_string(), def)))
            .collect::<AppResult<HashMap<_, _>>>()?;

        Ok(Self { definitions })
    }

    /// Built-in prompts only.
    pub fn builtin() -> AppResult<Self> {
        let definitions = catalog::builtin_ids()
            .map(|id| catalog::builtin(id).map(|def| (id.to_string(), def)))
            .collect::<AppResult<HashMap<_, _>>>()?;

        Ok(Self { definitions })
    }

    pub fn build(&self, prompt_id: &str, variables: &[(&str, &str)]) -> AppResult<BuiltPrompt> {
        let definition = self
            .definitions
            .get(prompt_id)
            .ok_or_else(|| AppError::Prompt(format!("Prompt not loaded: {}", prompt_id)))?;

        let variables = variables
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        build_prompt(definition, variables)
    }
}

/// Prompt set plus inference backend, shared by all steps.
#[derive(Clone)]
pub struct PromptRunner {
    inference: Arc<dyn Inference>,
    prompts: Arc<Prompts>,
}

impl PromptRunner {
    pub fn new(inference: Arc<dyn Inference>, prompts: Arc<Prompts>) -> Self {
        Self { inference, prompts }
    }

    /// Build `prompt_id` with `variables` and run it.
    pub async fn run(&self, prompt_id: &str, variables: &[(&str, &str)]) -> AppResult<String> {
        let prompt = self.prompts.build(prompt_id, variables)?;
        self.inference.infer(&prompt).await
    }
}

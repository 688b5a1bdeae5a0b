//! Configuration management for Stock Insights.
//!
//! Configuration is merged from several sources, lowest precedence first:
//! - Built-in defaults
//! - The workspace config file (`.insights/config.yaml`)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric; durable state lives in `.insights/`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .insights/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Inference backend settings
    pub llm: LlmSettings,

    /// Embedding backend settings
    pub embedding: EmbeddingSettings,

    /// Record store and index locations
    pub storage: StorageSettings,

    /// Chunking and retrieval settings
    pub retrieval: RetrievalSettings,

    /// External search settings
    pub web_search: WebSearchSettings,

    /// Structured-data engine settings
    pub structured: StructuredSettings,
}

/// Inference backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LlmSettings {
    /// Provider identifier ("ollama")
    pub provider: String,

    /// Base URL of the provider API
    pub endpoint: String,

    /// Model identifier
    pub model: String,

    /// Sampling temperature; graders and SQL generation want 0
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            endpoint: "http://localhost:11434".to_string(),
            model: "qwen2.5-coder:7b".to_string(),
            temperature: 0.0,
            timeout_secs: 120,
        }
    }
}

/// Embedding backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingSettings {
    /// Provider identifier ("ollama" or "mock")
    pub provider: String,

    /// Embedding model identifier
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
        }
    }
}

/// Durable storage and index locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageSettings {
    /// SQLite file holding news records (relative to the workspace)
    pub records_path: PathBuf,

    /// SQLite file holding the vector index (relative to the workspace)
    pub index_path: PathBuf,

    /// Index collection name
    pub collection: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            records_path: PathBuf::from(".insights/records.sqlite"),
            index_path: PathBuf::from(".insights/index.sqlite"),
            collection: "news_articles".to_string(),
        }
    }
}

/// Chunking and retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrievalSettings {
    /// Chunk capacity in tokens
    pub chunk_size: usize,

    /// Number of documents returned by a similarity search
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            chunk_size: 250,
            top_k: 4,
        }
    }
}

/// External search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WebSearchSettings {
    /// Whether live external search is enabled
    pub enabled: bool,

    /// Environment variable holding the search API key
    pub api_key_env: String,

    /// Search API endpoint
    pub endpoint: String,

    /// Results requested per query
    pub max_results: u32,
}

impl Default for WebSearchSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key_env: "TAVILY_API_KEY".to_string(),
            endpoint: "https://api.tavily.com/search".to_string(),
            max_results: 3,
        }
    }
}

/// Structured-data engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StructuredSettings {
    /// Postgres connection URL
    pub database_url: Option<String>,

    /// Maximum regenerate-and-execute retries
    pub max_retries: u32,
}

impl Default for StructuredSettings {
    fn default() -> Self {
        Self {
            database_url: None,
            max_retries: 3,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    llm: Option<LlmSettings>,
    embedding: Option<EmbeddingSettings>,
    storage: Option<StorageSettings>,
    retrieval: Option<RetrievalSettings>,
    web_search: Option<WebSearchSettings>,
    structured: Option<StructuredSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

const KNOWN_LLM_PROVIDERS: [&str; 1] = ["ollama"];
const KNOWN_EMBEDDING_PROVIDERS: [&str; 2] = ["ollama", "mock"];

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: LlmSettings::default(),
            embedding: EmbeddingSettings::default(),
            storage: StorageSettings::default(),
            retrieval: RetrievalSettings::default(),
            web_search: WebSearchSettings::default(),
            structured: StructuredSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the config file, environment variables and defaults.
    ///
    /// Environment variables:
    /// - `INSIGHTS_WORKSPACE`: Override workspace path
    /// - `INSIGHTS_CONFIG`: Path to config file
    /// - `INSIGHTS_PROVIDER`: Inference provider
    /// - `OLLAMA_BASE_URL`: Inference/embedding endpoint
    /// - `LLM_MODEL`: Inference model
    /// - `EMBEDDING_MODEL`: Embedding model
    /// - `VECTOR_DB_COLLECTION`: Index collection name
    /// - `ENABLE_WEB_SEARCH`: "true" enables live external search
    /// - `DATABASE_URL`: Structured-data engine URL
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use insights_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("INSIGHTS_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("INSIGHTS_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.workspace.join(".insights/config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        config.apply_env();

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        Ok(self.clone().merge_file(config_file))
    }

    fn merge_file(mut self, file: ConfigFile) -> Self {
        if let Some(path) = file.workspace.and_then(|ws| ws.path) {
            self.workspace = PathBuf::from(path);
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
        }

        if let Some(llm) = file.llm {
            self.llm = llm;
        }
        if let Some(embedding) = file.embedding {
            self.embedding = embedding;
        }
        if let Some(storage) = file.storage {
            self.storage = storage;
        }
        if let Some(retrieval) = file.retrieval {
            self.retrieval = retrieval;
        }
        if let Some(web_search) = file.web_search {
            self.web_search = web_search;
        }
        if let Some(structured) = file.structured {
            self.structured = structured;
        }

        self
    }

    /// Environment variables override the YAML config.
    fn apply_env(&mut self) {
        if let Ok(provider) = std::env::var("INSIGHTS_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Ok(endpoint) = std::env::var("OLLAMA_BASE_URL") {
            self.llm.endpoint = endpoint;
        }
        if let Ok(model) = std::env::var("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Ok(collection) = std::env::var("VECTOR_DB_COLLECTION") {
            self.storage.collection = collection;
        }
        if let Ok(enabled) = std::env::var("ENABLE_WEB_SEARCH") {
            self.web_search.enabled = enabled.eq_ignore_ascii_case("true");
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.structured.database_url = Some(url);
        }

        self.log_level = std::env::var("RUST_LOG").ok().or(self.log_level.take());

        if std::env::var("NO_COLOR").is_ok() {
            self.no_color = true;
        }
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.llm.provider = provider;
        }

        if let Some(model) = model {
            self.llm.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .insights directory.
    pub fn insights_dir(&self) -> PathBuf {
        self.workspace.join(".insights")
    }

    /// Ensure the .insights directory exists.
    pub fn ensure_insights_dir(&self) -> AppResult<()> {
        let dir = self.insights_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .insights directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Absolute path of the record store.
    pub fn records_path(&self) -> PathBuf {
        self.workspace.join(&self.storage.records_path)
    }

    /// Absolute path of the vector index.
    pub fn index_path(&self) -> PathBuf {
        self.workspace.join(&self.storage.index_path)
    }

    /// Resolve the external search API key, if live search is usable.
    ///
    /// Returns `None` when search is disabled or the key variable is unset.
    pub fn resolve_search_api_key(&self) -> Option<String> {
        if !self.web_search.enabled {
            return None;
        }

        let key = std::env::var(&self.web_search.api_key_env).ok();
        if key.is_none() {
            tracing::warn!(
                "Web search enabled but {} is not set; using placeholder results",
                self.web_search.api_key_env
            );
        }
        key
    }

    /// Validate the merged configuration.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_LLM_PROVIDERS.contains(&self.llm.provider.to_lowercase().as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.llm.provider,
                KNOWN_LLM_PROVIDERS.join(", ")
            )));
        }

        if !KNOWN_EMBEDDING_PROVIDERS.contains(&self.embedding.provider.to_lowercase().as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if self.retrieval.chunk_size == 0 {
            return Err(AppError::Config(
                "retrieval.chunkSize must be greater than zero".to_string(),
            ));
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config(
                "retrieval.topK must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

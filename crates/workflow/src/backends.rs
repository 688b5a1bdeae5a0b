//! Process-wide backend registry.
//!
//! The inference client and embedding provider are built at most once and
//! shared by every workflow instance constructed from the same registry.

use crate::augment::Augmenter;
use crate::executor::{PgQueryExecutor, QueryExecutor};
use crate::gates::QueryRewriter;
use crate::inference::{LlmInference, PromptRunner, Prompts};
use crate::news::NewsWorkflow;
use crate::search::create_search;
use crate::stock::StockQueryWorkflow;
use insights_core::{AppConfig, AppError, AppResult};
use insights_knowledge::{
    create_provider, DocumentSyncManager, EmbeddingProvider, IndexRetriever, Retriever,
    SqliteRecordStore, SqliteVectorIndex, TokenChunker,
};
use insights_llm::{create_client, LlmClient};
use std::sync::Arc;
use tokio::sync::OnceCell;

pub struct Backends {
    config: AppConfig,
    llm: OnceCell<Arc<dyn LlmClient>>,
    embedder: OnceCell<Arc<dyn EmbeddingProvider>>,
}

impl Backends {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            llm: OnceCell::new(),
            embedder: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn llm(&self) -> AppResult<Arc<dyn LlmClient>> {
        let client = self
            .llm
            .get_or_try_init(|| async { create_client(&self.config.llm) })
            .await?;
        Ok(client.clone())
    }

    pub async fn embedder(&self) -> AppResult<Arc<dyn EmbeddingProvider>> {
        let embedder = self
            .embedder
            .get_or_try_init(|| async {
                create_provider(&self.config.embedding, &self.config.llm.endpoint)
            })
            .await?;
        Ok(embedder.clone())
    }

    pub fn record_store(&self) -> AppResult<Arc<SqliteRecordStore>> {
        Ok(Arc::new(SqliteRecordStore::open(self.config.records_path())?))
    }

    pub async fn sync_manager(&self) -> AppResult<DocumentSyncManager> {
        let index = SqliteVectorIndex::open(
            self.config.index_path(),
            self.config.storage.collection.as_str(),
        )?;

        Ok(DocumentSyncManager::new(
            self.record_store()?,
            Arc::new(index),
            self.embedder().await?,
            TokenChunker::new(self.config.retrieval.chunk_size)?,
            self.config.storage.collection.as_str(),
        ))
    }

    async fn runner(&self) -> AppResult<PromptRunner> {
        let inference = LlmInference::new(
            self.llm().await?,
            self.config.llm.model.as_str(),
            self.config.llm.temperature,
        );
        let prompts = Prompts::load(&self.config.workspace)?;

        Ok(PromptRunner::new(Arc::new(inference), Arc::new(prompts)))
    }

    async fn retriever(&self) -> AppResult<Arc<dyn Retriever>> {
        let embedder = self.embedder().await?;
        let top_k = self.config.retrieval.top_k;

        let retriever = match SqliteVectorIndex::open_existing(
            self.config.index_path(),
            self.config.storage.collection.as_str(),
        ) {
            Ok(index) => IndexRetriever::new(embedder, Arc::new(index), top_k),
            Err(e) => {
                tracing::warn!("Vector index unavailable: {}", e);
                IndexRetriever::unavailable(embedder, top_k)
            }
        };

        Ok(Arc::new(retriever))
    }

    pub async fn news_workflow(&self) -> AppResult<NewsWorkflow> {
        let runner = self.runner().await?;
        let search = create_search(
            &self.config.web_search,
            self.config.resolve_search_api_key(),
        );

        let augmenter = Augmenter::new(QueryRewriter::new(runner.clone()), search)
            .with_persistence(self.record_store()?, Arc::new(self.sync_manager().await?));

        Ok(NewsWorkflow::new(self.retriever().await?, augmenter, runner))
    }

    pub async fn stock_workflow(&self) -> AppResult<StockQueryWorkflow> {
        let database_url = self.config.structured.database_url.as_deref().ok_or_else(|| {
            AppError::Config(
                "DATABASE_URL is not set; the stock workflow needs a PostgreSQL database"
                    .to_string(),
            )
        })?;
        let executor: Arc<dyn QueryExecutor> = Arc::new(PgQueryExecutor::connect_lazy(database_url)?);

        Ok(StockQueryWorkflow::new(self.runner().await?, executor)
            .with_max_retries(self.config.structured.max_retries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(temp: &TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.workspace = temp.path().to_path_buf();
        config.embedding.provider = "mock".to_string();
        config.embedding.dimensions = 32;
        config
    }

    #[tokio::test]
    async fn test_backends_are_built_once() {
        let temp = TempDir::new().unwrap();
        let backends = Backends::new(config(&temp));

        let first = backends.llm().await.unwrap();
        let second = backends.llm().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let first = backends.embedder().await.unwrap();
        let second = backends.embedder().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_unknown_provider_is_a_config_error() {
        let temp = TempDir::new().unwrap();
        let mut config = config(&temp);
        config.llm.provider = "nowhere".to_string();

        let err = Backends::new(config).llm().await.err().unwrap();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[tokio::test]
    async fn test_stock_workflow_requires_database_url() {
        let temp = TempDir::new().unwrap();
        let mut config = config(&temp);
        config.structured.database_url = None;

        let err = Backends::new(config).stock_workflow().await.err().unwrap();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[tokio::test]
    async fn test_news_workflow_builds_without_index() {
        let temp = TempDir::new().unwrap();
        let backends = Backends::new(config(&temp));

        assert!(backends.news_workflow().await.is_ok());
        assert!(backends.config().records_path().exists());
    }
}

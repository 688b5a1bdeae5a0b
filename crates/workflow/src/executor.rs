//! Structured-data query execution.

use insights_core::{AppError, AppResult};
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Result rows, one JSON object per row.
pub type QueryRows = Vec<serde_json::Value>;

#[async_trait::async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run `sql` and return its rows.
    ///
    /// Engine errors are reported as [`AppError::Query`] carrying the
    /// engine's message.
    async fn execute(&self, sql: &str) -> AppResult<QueryRows>;
}

/// Wrap a statement so the engine returns its rows as one JSON array.
pub fn wrap_as_json(sql: &str) -> String {
    let statement = sql.trim().trim_end_matches(';').trim_end();
    format!(
        "SELECT COALESCE(json_agg(t), '[]'::json) FROM ({}) t",
        statement
    )
}

/// PostgreSQL executor over a lazily connected pool.
pub struct PgQueryExecutor {
    pool: PgPool,
}

impl PgQueryExecutor {
    /// Build the pool without connecting; the first query connects.
    pub fn connect_lazy(database_url: &str) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(database_url)
            .map_err(|e| AppError::Config(format!("Invalid database URL: {}", e)))?;

        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl QueryExecutor for PgQueryExecutor {
    async fn execute(&self, sql: &str) -> AppResult<QueryRows> {
        let wrapped = wrap_as_json(sql);
        tracing::debug!(sql = %wrapped, "Executing query");

        let value = sqlx::query_scalar::<_, serde_json::Value>(&wrapped)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Query(e.to_string()))?;

        match value {
            serde_json::Value::Array(rows) => Ok(rows),
            other => Err(AppError::Query(format!(
                "Expected a JSON array of rows, got: {}",
                other
            ))),
        }
    }
}

//! Question-answering workflows for Stock Insights.
//!
//! Two state machines sit on top of the knowledge store and an inference
//! backend: [`news::NewsWorkflow`] answers from retrieved and searched news,
//! [`stock::StockQueryWorkflow`] answers from generated SQL over price data.

pub mod augment;
pub mod backends;
pub mod executor;
pub mod gates;
pub mod inference;
pub mod news;
pub mod run;
pub mod search;
pub mod sql;
pub mod stock;


pub use augment::{Augmentation, Augmenter};
pub use backends::Backends;
pub use executor::{PgQueryExecutor, QueryExecutor, QueryRows};
pub use gates::{parse_verdict, GradingGate, GroundingGate, QueryRewriter, Verdict};
pub use inference::{Inference, LlmInference, PromptRunner, Prompts};
pub use news::{NewsState, NewsStep, NewsWorkflow, REFUSAL};
pub use run::WorkflowRun;
pub use search::{create_search, ExternalSearch, PlaceholderSearch, SearchHit, TavilySearch};
pub use stock::{price_stats_question, StockQueryState, StockQueryWorkflow, StockStep};

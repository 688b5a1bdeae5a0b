//! Prompt system for Stock Insights.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions
//! - A built-in catalog covering every inference call site
//! - Per-workspace overrides in `.insights/prompts/`
//! - Handlebars template rendering

pub mod builder;
pub mod catalog;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{list_prompts, load_prompt, resolve_prompt};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition, PromptOutputSpec};

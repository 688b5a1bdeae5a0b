//! Built-in prompt catalog.
//!
//! Every inference call site has a default definition compiled into the
//! binary. Workspaces can shadow any of them with a file of the same id in
//! `.insights/prompts/`.

use crate::types::PromptDefinition;
use insights_core::{AppError, AppResult};

/// Relevance grading of one retrieved document.
pub const RELEVANCE_GRADER: &str = "news.grade.relevance";
/// Grounding check of a generated answer against its documents.
pub const GROUNDING_GRADER: &str = "news.grade.grounding";
/// Alternative web search query generation.
pub const SEARCH_QUERIES: &str = "news.search.queries";
/// Answer generation from news documents.
pub const NEWS_ANSWER: &str = "news.answer";
/// Natural language to SQL translation.
pub const SQL_GENERATION: &str = "stock.sql.generate";
/// Answer generation from query result rows.
pub const STOCK_ANSWER: &str = "stock.answer";

const BUILTINS: [(&str, &str); 6] = [
    (
        RELEVANCE_GRADER,
        include_str!("../prompts/news.grade.relevance.yml"),
    ),
    (
        GROUNDING_GRADER,
        include_str!("../prompts/news.grade.grounding.yml"),
    ),
    (
        SEARCH_QUERIES,
        include_str!("../prompts/news.search.queries.yml"),
    ),
    (NEWS_ANSWER, include_str!("../prompts/news.answer.yml")),
    (SQL_GENERATION, include_str!("../prompts/stock.sql.generate.yml")),
    (STOCK_ANSWER, include_str!("../prompts/stock.answer.yml")),
];

/// Ids of all built-in prompts.
pub fn builtin_ids() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|(id, _)| *id)
}

/// Parse the built-in definition for `prompt_id`.
pub fn builtin(prompt_id: &str) -> AppResult<PromptDefinition> {
    let (_, source) = BUILTINS
        .iter()
        .find(|(id, _)| *id == prompt_id)
        .ok_or_else(|| AppError::Prompt(format!("No built-in prompt: {}", prompt_id)))?;

    serde_yaml::from_str(source).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse built-in prompt {}: {}",
            prompt_id, e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_builtins_parse_with_matching_ids() {
        for id in builtin_ids() {
            let def = builtin(id).unwrap();
            assert_eq!(def.id, id);
            assert!(def.system.is_some(), "{} has no system text", id);
        }
    }

    #[test]
    fn test_unknown_builtin() {
        assert!(builtin("stock.unknown").is_err());
    }

    #[test]
    fn test_sql_prompt_mentions_table_and_suffix() {
        let def = builtin(SQL_GENERATION).unwrap();
        let system = def.system.unwrap();
        assert!(system.contains("stock_data("));
        assert!(system.contains(".NS"));
        assert!(def.template.contains("{{#if error}}"));
    }
}

//! Inference-backed yes/no gates and query rewriting.
//!
//! Every gate resolves an unusable model reply to a fixed branch instead of
//! failing the run. Relevance and grounding default to "no"; query rewriting
//! falls back to a single templated query.

use crate::inference::PromptRunner;
use insights_knowledge::Document;
use insights_prompt::catalog;

const MAX_REWRITTEN_QUERIES: usize = 3;

/// A model's answer to a yes/no prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Yes,
    No,
    Unparseable,
}

impl Verdict {
    /// Only an explicit "yes" counts as a pass.
    pub fn passed(self) -> bool {
        self == Verdict::Yes
    }
}

/// Read a yes/no verdict, ignoring case, whitespace and trailing punctuation.
pub fn parse_verdict(reply: &str) -> Verdict {
    let word = reply
        .trim()
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '.' | '!' | '\'' | '"'));

    if word.eq_ignore_ascii_case("yes") {
        Verdict::Yes
    } else if word.eq_ignore_ascii_case("no") {
        Verdict::No
    } else {
        Verdict::Unparseable
    }
}

fn gate_outcome(gate: &str, reply: &str) -> bool {
    let verdict = parse_verdict(reply);
    if verdict == Verdict::Unparseable {
        tracing::warn!(gate, reply, "Unparseable verdict, treating as 'no'");
    }
    verdict.passed()
}

/// Decides whether one retrieved document is relevant to the question.
#[derive(Clone)]
pub struct GradingGate {
    runner: PromptRunner,
}

impl GradingGate {
    pub fn new(runner: PromptRunner) -> Self {
        Self { runner }
    }

    pub async fn is_relevant(&self, question: &str, document: &Document) -> bool {
        let reply = self
            .runner
            .run(
                catalog::RELEVANCE_GRADER,
                &[("document", document.content.as_str()), ("question", question)],
            )
            .await;

        match reply {
            Ok(reply) => gate_outcome("relevance", &reply),
            Err(e) => {
                tracing::warn!("Relevance grading failed, dropping document: {}", e);
                false
            }
        }
    }
}

/// Decides whether an answer is supported by its documents.
#[derive(Clone)]
pub struct GroundingGate {
    runner: PromptRunner,
}

impl GroundingGate {
    pub fn new(runner: PromptRunner) -> Self {
        Self { runner }
    }

    pub async fn is_grounded(&self, documents: &[Document], answer: &str) -> bool {
        let facts = join_contents(documents);
        let reply = self
            .runner
            .run(
                catalog::GROUNDING_GRADER,
                &[("documents", facts.as_str()), ("generation", answer)],
            )
            .await;

        match reply {
            Ok(reply) => gate_outcome("grounding", &reply),
            Err(e) => {
                tracing::warn!("Grounding check failed, treating answer as ungrounded: {}", e);
                false
            }
        }
    }
}

/// Produces web search queries for a question.
#[derive(Clone)]
pub struct QueryRewriter {
    runner: PromptRunner,
}

impl QueryRewriter {
    pub fn new(runner: PromptRunner) -> Self {
        Self { runner }
    }

    /// Up to three alternative queries, never empty.
    pub async fn rewrite(&self, question: &str, ticker: &str) -> Vec<String> {
        let reply = self
            .runner
            .run(
                catalog::SEARCH_QUERIES,
                &[("question", question), ("ticker", ticker)],
            )
            .await;

        let queries = match reply {
            Ok(reply) => parse_queries(&reply),
            Err(e) => {
                tracing::warn!("Query rewriting failed: {}", e);
                Vec::new()
            }
        };

        if queries.is_empty() {
            vec![fallback_query(question, ticker)]
        } else {
            queries
        }
    }
}

fn parse_queries(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(MAX_REWRITTEN_QUERIES)
        .map(str::to_string)
        .collect()
}

fn fallback_query(question: &str, ticker: &str) -> String {
    if ticker.is_empty() {
        format!("{} stock news", question)
    } else {
        format!("{} {} stock news", question, ticker)
    }
}

/// Document contents separated by blank lines.
pub(crate) fn join_contents(documents: &[Document]) -> String {
    documents
        .iter()
        .map(|d| d.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verdict_variants() {
        assert_eq!(parse_verdict("yes"), Verdict::Yes);
        assert_eq!(parse_verdict("  Yes.\n"), Verdict::Yes);
        assert_eq!(parse_verdict("'YES'"), Verdict::Yes);
        assert_eq!(parse_verdict("No!"), Verdict::No);
        assert_eq!(parse_verdict("\"no\""), Verdict::No);
    }

    #[test]
    fn test_anything_else_is_unparseable() {
        assert_eq!(parse_verdict(""), Verdict::Unparseable);
        assert_eq!(parse_verdict("maybe"), Verdict::Unparseable);
        assert_eq!(parse_verdict("yes, the document is relevant"), Verdict::Unparseable);
        assert!(!parse_verdict("I think so").passed());
    }

    #[test]
    fn test_parse_queries_caps_at_three() {
        let reply = "HDFC bank results\n\n  HDFC Q3 earnings \nHDFC share price\nHDFC dividend\n";
        assert_eq!(
            parse_queries(reply),
            vec!["HDFC bank results", "HDFC Q3 earnings", "HDFC share price"]
        );
    }

    #[test]
    fn test_blank_reply_yields_no_queries() {
        assert!(parse_queries("\n  \n").is_empty());
        assert_eq!(
            fallback_query("Latest news?", "ITC.NS"),
            "Latest news? ITC.NS stock news"
        );
    }

    #[test]
    fn test_fallback_query_without_ticker() {
        assert_eq!(fallback_query("Latest news?", ""), "Latest news? stock news");
    }

    #[test]
    fn test_join_contents() {
        let docs = vec![Document::new("one"), Document::new("two")];
        assert_eq!(join_contents(&docs), "one\n\ntwo");
    }
}

//! Cleanup of model-generated SQL before execution.
//!
//! Pure text substitution: extract the statement from a code fence, then
//! rewrite SQLite date idioms into PostgreSQL, fix the known table-name
//! typo and normalize identifier quoting.

use regex::Regex;
use std::sync::LazyLock;

/// Extract the statement from raw model output.
///
/// Newlines are flattened to spaces first. If a ```` ```sql ```` (or bare
/// ```` ``` ````) fence is present its body is returned, otherwise the
/// flattened text.
pub fn extract_sql(raw: &str) -> String {
    static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?is)```(?:sql)?\s+(.*?)\s*```").expect("valid regex")
    });

    let flat = raw.replace(['\r', '\n'], " ");

    match FENCE_RE.captures(&flat) {
        Some(caps) => caps[1].to_string(),
        None => flat,
    }
}

/// Apply the dialect and typo rewrites, in order.
///
/// 1. `sstock_data` → `stock_data` (whole word, any case)
/// 2. `date('now')` → `CURRENT_DATE`
/// 3. `date('now','-N days')` → `CURRENT_DATE - INTERVAL 'N days'`
/// 4. `datetime('now','-N days')` → `CURRENT_DATE - INTERVAL 'N days'`
/// 5. backticks → double quotes
pub fn normalize_sql(sql: &str) -> String {
    static TABLE_TYPO_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)\bsstock_data\b").expect("valid regex"));
    static DATE_NOW_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)date\(\s*'now'\s*\)").expect("valid regex"));
    static DATE_OFFSET_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)\bdate\(\s*'now'\s*,\s*'-(\d+)\s*days?'\s*\)").expect("valid regex")
    });
    static DATETIME_OFFSET_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)datetime\(\s*'now'\s*,\s*'-(\d+)\s*days?'\s*\)").expect("valid regex")
    });

    let s = TABLE_TYPO_RE.replace_all(sql, "stock_data");
    let s = DATE_NOW_RE.replace_all(&s, "CURRENT_DATE");
    let s = DATE_OFFSET_RE.replace_all(&s, "CURRENT_DATE - INTERVAL '${1} days'");
    let s = DATETIME_OFFSET_RE.replace_all(&s, "CURRENT_DATE - INTERVAL '${1} days'");

    s.replace('`', "\"")
}

/// Extract, normalize and trim raw model output.
pub fn prepare_sql(raw: &str) -> String {
    normalize_sql(&extract_sql(raw)).trim().to_string()
}

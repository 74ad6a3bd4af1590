pub mod news;
pub mod web;

pub use news::{NewsRequest, NewsSearchParams};
pub use web::{WebRequest, WebSearchParams};

pub const MAX_QUERY_LENGTH: usize = 400;
pub const MAX_RESULTS: u32 = 20;

/// Shared query checks: trimmed non-empty, bounded length.
pub(crate) fn checked_query(raw: &str) -> Result<String, String> {
    let query = raw.trim();
    if query.is_empty() {
        return Err("Query cannot be empty".into());
    }
    if query.chars().count() > MAX_QUERY_LENGTH {
        return Err(format!("Query exceeds {MAX_QUERY_LENGTH} characters"));
    }
    Ok(query.to_string())
}

/// Resolve `limit`/`count` precedence after range-checking both. `limit`
/// wins when both are present; `None` defers to the configured default.
pub(crate) fn checked_requested(limit: Option<u32>, count: Option<u32>) -> Result<Option<u32>, String> {
    for value in [limit, count].into_iter().flatten() {
        if value < 1 || value > MAX_RESULTS {
            return Err(format!("Result count must be between 1 and {MAX_RESULTS}"));
        }
    }
    Ok(limit.or(count))
}

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{checked_query, checked_requested};
use crate::ddg::types::{SafeSearch, TimeRange};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NewsSearchParams {
    /// Search query (max 400 characters)
    pub query: String,

    /// Number of results to return (1-20)
    #[serde(default)]
    pub limit: Option<u32>,

    /// Legacy alias for `limit`; `limit` wins when both are given
    #[serde(default)]
    pub count: Option<u32>,

    /// Content filtering: "strict", "moderate" (default) or "off"
    #[serde(default, rename = "safeSearch")]
    pub safe_search: Option<String>,

    /// Recency filter: "day", "week", "month", "year" or "all" (default)
    #[serde(default)]
    pub time: Option<String>,
}

/// A news request that passed validation.
#[derive(Debug, Clone)]
pub struct NewsRequest {
    pub query: String,
    pub requested: Option<u32>,
    pub safe_search: SafeSearch,
    pub time: TimeRange,
}

impl NewsSearchParams {
    pub fn validate(&self) -> Result<NewsRequest, String> {
        let query = checked_query(&self.query)?;
        let requested = checked_requested(self.limit, self.count)?;

        let safe_search = match &self.safe_search {
            None => SafeSearch::default(),
            Some(raw) => SafeSearch::parse(raw)
                .ok_or("safeSearch must be one of strict, moderate, off")?,
        };

        let time = match &self.time {
            None => TimeRange::default(),
            Some(raw) => TimeRange::parse(raw)
                .ok_or("time must be one of day, week, month, year, all")?,
        };

        Ok(NewsRequest { query, requested, safe_search, time })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(query: &str) -> NewsSearchParams {
        NewsSearchParams {
            query: query.into(),
            limit: None,
            count: None,
            safe_search: None,
            time: None,
        }
    }

    #[test]
    fn validates_query_like_web_search() {
        assert!(params("").validate().is_err());
        assert!(params(&"q".repeat(401)).validate().is_err());
        assert!(params("elections").validate().is_ok());
    }

    #[test]
    fn count_falls_back_when_limit_absent() {
        let mut p = params("elections");
        p.count = Some(4);
        assert_eq!(p.validate().unwrap().requested, Some(4));
    }

    #[test]
    fn time_range_parses() {
        let mut p = params("elections");
        p.time = Some("day".into());
        assert_eq!(p.validate().unwrap().time, TimeRange::Day);
        p.time = Some("never".into());
        assert!(p.validate().is_err());
    }

    #[test]
    fn safe_search_parses() {
        let mut p = params("elections");
        p.safe_search = Some("off".into());
        assert_eq!(p.validate().unwrap().safe_search, SafeSearch::Off);
    }
}

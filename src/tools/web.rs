use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{checked_query, checked_requested};
use crate::ddg::types::{is_valid_region, SafeSearch, TimeRange, WORLDWIDE_REGION};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WebSearchParams {
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

    /// Region code such as "us-en" or "de-de"; defaults to worldwide
    #[serde(default)]
    pub region: Option<String>,

    /// Recency filter: "day", "week", "month", "year" or "all" (default)
    #[serde(default)]
    pub time: Option<String>,
}

/// A web request that passed validation; only this form reaches the
/// limiter and the provider.
#[derive(Debug, Clone)]
pub struct WebRequest {
    pub query: String,
    pub requested: Option<u32>,
    pub safe_search: SafeSearch,
    pub region: String,
    pub time: TimeRange,
}

impl WebSearchParams {
    pub fn validate(&self) -> Result<WebRequest, String> {
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

        let region = match &self.region {
            None => WORLDWIDE_REGION.to_string(),
            Some(raw) => {
                if !is_valid_region(raw) {
                    return Err(format!("Unknown region code: {}", raw.trim()));
                }
                raw.trim().to_lowercase()
            }
        };

        Ok(WebRequest { query, requested, safe_search, region, time })
    }
}

use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::types::{NewsArticle, SearchOptions, SearchOutcome, WebPage};
use super::SearchProvider;
use crate::error::{Result, ServerError};

const CONNECT_TIMEOUT: u64 = 10;
const REQUEST_TIMEOUT: u64 = 30;
const RETRY_MAX_ATTEMPTS: u32 = 3;
const RETRY_MAX_WAIT_SECS: f64 = 10.0;

const TOKEN_URL: &str = "https://duckduckgo.com/";
const WEB_URL: &str = "https://links.duckduckgo.com/d.js";
const NEWS_URL: &str = "https://duckduckgo.com/news.js";

// The endpoints refuse requests without a browser-like identity.
const BROWSER_UA: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Client for DuckDuckGo's unofficial JSON endpoints. Each search first
/// obtains a `vqd` session token for the query, then hits the result
/// endpoint with the translated parameters.
#[derive(Debug, Clone)]
pub struct DdgClient {
    client: reqwest::Client,
}

/// One row of the `d.js` payload. Keys are single letters on the wire;
/// rows carrying `n` are pagination cursors, not results.
#[derive(Debug, Deserialize)]
struct RawWebRow {
    #[serde(default)]
    t: Option<String>,
    #[serde(default)]
    a: Option<String>,
    #[serde(default)]
    u: Option<String>,
    #[serde(default)]
    i: Option<String>,
    #[serde(default)]
    n: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawWebPayload {
    #[serde(default)]
    results: Vec<RawWebRow>,
}

#[derive(Debug, Deserialize)]
struct RawNewsRow {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    excerpt: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    date: Option<i64>,
    #[serde(default, alias = "relativeTime")]
    relative_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawNewsPayload {
    #[serde(default)]
    results: Vec<RawNewsRow>,
}

impl DdgClient {
    pub fn new() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_UA));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/html;q=0.9, */*;q=0.8"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT))
            .build()
            .expect("failed to build HTTP client");

        Self { client }
    }

    /// Fetch the per-query `vqd` token from the search landing page.
    async fn token(&self, query: &str) -> Result<String> {
        let body = self
            .get_text(TOKEN_URL, &[("q", query.to_string()), ("ia", "web".to_string())])
            .await?;
        extract_vqd(&body).ok_or(ServerError::MissingToken)
    }

    async fn get_text(&self, url: &str, params: &[(&str, String)]) -> Result<String> {
        let resp = self.request_with_retry(url, params).await?;
        resp.text().await.map_err(map_err)
    }

    async fn request_with_retry(&self, url: &str, params: &[(&str, String)]) -> Result<reqwest::Response> {
        let mut last_err = String::new();
        for attempt in 0..=RETRY_MAX_ATTEMPTS {
            match self.try_request(url, params).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if !is_retryable(&e) || attempt >= RETRY_MAX_ATTEMPTS {
                        if attempt >= RETRY_MAX_ATTEMPTS {
                            return Err(ServerError::MaxRetries {
                                attempts: RETRY_MAX_ATTEMPTS + 1,
                                last_error: e.to_string(),
                            });
                        }
                        return Err(e);
                    }
                    last_err = e.to_string();
                    let delay = backoff(attempt);
                    warn!(
                        "DuckDuckGo request failed, retrying in {:?} (attempt {}/{}): {}",
                        delay,
                        attempt + 1,
                        RETRY_MAX_ATTEMPTS + 1,
                        last_err
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
        Err(ServerError::MaxRetries { attempts: RETRY_MAX_ATTEMPTS + 1, last_error: last_err })
    }

    async fn try_request(&self, url: &str, params: &[(&str, String)]) -> Result<reqwest::Response> {
        let resp = self.client.get(url).query(params).send().await.map_err(map_err)?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(ServerError::Api { status, message });
        }
        Ok(resp)
    }

    fn shape_params(query: &str, vqd: String, opts: &SearchOptions) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", query.to_string()),
            ("o", "json".to_string()),
            ("vqd", vqd),
            ("kl", opts.region.clone()),
            ("p", opts.safe_search.provider_level().to_string()),
        ];
        // "all" carries no df parameter at all.
        if let Some(window) = opts.time.provider_window() {
            params.push(("df", window.to_string()));
        }
        params
    }
}

impl Default for DdgClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SearchProvider for DdgClient {
    async fn web(&self, query: &str, opts: &SearchOptions) -> Result<SearchOutcome<WebPage>> {
        let vqd = self.token(query).await?;
        let params = DdgClient::shape_params(query, vqd, opts);

        let resp = self.request_with_retry(WEB_URL, &params).await?;
        let payload: RawWebPayload = resp.json().await.map_err(map_err)?;

        let results: Vec<WebPage> = payload
            .results
            .into_iter()
            .filter(|row| row.n.is_none())
            .filter_map(|row| {
                let url = row.u?;
                Some(WebPage {
                    title: clean_html(row.t.as_deref().unwrap_or_default()),
                    snippet: clean_html(row.a.as_deref().unwrap_or_default()),
                    hostname: row.i.unwrap_or_default(),
                    url,
                })
            })
            .collect();

        debug!("DuckDuckGo returned {} web results", results.len());
        Ok(SearchOutcome::of(results))
    }

    async fn news(&self, query: &str, opts: &SearchOptions) -> Result<SearchOutcome<NewsArticle>> {
        let vqd = self.token(query).await?;
        let mut params = DdgClient::shape_params(query, vqd, opts);
        params.push(("noamp", "1".to_string()));

        let resp = self.request_with_retry(NEWS_URL, &params).await?;
        let payload: RawNewsPayload = resp.json().await.map_err(map_err)?;

        let results: Vec<NewsArticle> = payload
            .results
            .into_iter()
            .filter_map(|row| {
                let url = row.url?;
                Some(NewsArticle {
                    title: clean_html(row.title.as_deref().unwrap_or_default()),
                    excerpt: clean_html(row.excerpt.as_deref().unwrap_or_default()),
                    source: row.source.unwrap_or_default(),
                    date: row.date.unwrap_or_default(),
                    relative_time: row.relative_time.unwrap_or_default(),
                    url,
                })
            })
            .collect();

        debug!("DuckDuckGo returned {} news results", results.len());
        Ok(SearchOutcome::of(results))
    }
}

fn map_err(e: reqwest::Error) -> ServerError {
    if e.is_timeout() {
        ServerError::Timeout(REQUEST_TIMEOUT)
    } else {
        ServerError::Http(e)
    }
}

fn is_retryable(e: &ServerError) -> bool {
    match e {
        ServerError::Timeout(_) => true,
        ServerError::Http(e) => e.is_timeout() || e.is_connect(),
        ServerError::Api { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
        _ => false,
    }
}

fn backoff(attempt: u32) -> Duration {
    let base = 1.0_f64 * 2.0_f64.powi(attempt as i32);
    let capped = base.min(RETRY_MAX_WAIT_SECS);
    let jitter = rand::thread_rng().gen_range(0.9..=1.1);
    Duration::from_secs_f64((capped * jitter).max(0.1))
}

/// Pull the `vqd` token out of the landing-page markup. The value shows up
/// either quoted (`vqd="..."`) or bare in a query string (`vqd=...&`).
fn extract_vqd(body: &str) -> Option<String> {
    for pat in ["vqd=\"", "vqd='"] {
        if let Some(start) = body.find(pat) {
            let rest = &body[start + pat.len()..];
            let quote = pat.chars().last()?;
            if let Some(end) = rest.find(quote) {
                let token = &rest[..end];
                if !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }
    if let Some(start) = body.find("vqd=") {
        let rest = &body[start + 4..];
        let end = rest.find(['&', '"', '\''].as_ref()).unwrap_or(rest.len());
        let token = &rest[..end];
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }
    None
}

/// Result titles and abstracts arrive as HTML fragments with highlight
/// markers. Drop the tags and decode the handful of entities DuckDuckGo
/// emits.
fn clean_html(raw: &str) -> String {
    let mut text = String::with_capacity(raw.len());
    let mut in_tag = false;
    for c in raw.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_quoted_vqd() {
        let body = r#"...;vqd="4-12345678901234567890";..."#;
        assert_eq!(extract_vqd(body).as_deref(), Some("4-12345678901234567890"));
    }

    #[test]
    fn extracts_bare_vqd_from_query_string() {
        let body = "https://duckduckgo.com/d.js?q=rust&vqd=4-987654321&kl=wt-wt";
        assert_eq!(extract_vqd(body).as_deref(), Some("4-987654321"));
    }

    #[test]
    fn missing_vqd_is_none() {
        assert_eq!(extract_vqd("<html>nothing here</html>"), None);
    }

    #[test]
    fn clean_html_strips_tags_and_entities() {
        assert_eq!(
            clean_html("<b>Rust</b> &amp; Cargo &#x27;24"),
            "Rust & Cargo '24"
        );
        assert_eq!(clean_html("plain text"), "plain text");
    }

    #[test]
    fn web_rows_drop_navigation_entries() {
        let payload: RawWebPayload = serde_json::from_str(
            r#"{"results":[
                {"t":"Title","a":"Snippet","u":"https://example.com","i":"example.com"},
                {"n":"/d.js?q=next-page"}
            ]}"#,
        )
        .unwrap();
        let rows: Vec<_> = payload
            .results
            .into_iter()
            .filter(|r| r.n.is_none() && r.u.is_some())
            .collect();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn news_rows_accept_both_relative_time_spellings() {
        let payload: RawNewsPayload = serde_json::from_str(
            r#"{"results":[
                {"title":"A","excerpt":"B","url":"https://n.example","source":"Example","date":1754000000,"relative_time":"2 hours ago"},
                {"title":"C","excerpt":"D","url":"https://m.example","source":"Example","date":1754000000,"relativeTime":"3 hours ago"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(payload.results[0].relative_time.as_deref(), Some("2 hours ago"));
        assert_eq!(payload.results[1].relative_time.as_deref(), Some("3 hours ago"));
    }

    #[test]
    fn all_time_range_adds_no_df_parameter() {
        let opts = SearchOptions {
            safe_search: crate::ddg::types::SafeSearch::Moderate,
            region: "wt-wt".into(),
            time: crate::ddg::types::TimeRange::All,
        };
        let params = DdgClient::shape_params("rust", "tok".into(), &opts);
        assert!(params.iter().all(|(k, _)| *k != "df"));

        let opts = SearchOptions { time: crate::ddg::types::TimeRange::Week, ..opts };
        let params = DdgClient::shape_params("rust", "tok".into(), &opts);
        assert!(params.contains(&("df", "w".to_string())));
    }
}

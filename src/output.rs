use serde::Serialize;
use url::Url;

use crate::config::{Config, OutputMode};
use crate::ddg::{NewsArticle, SearchOutcome, WebPage};
use crate::error::Result;

/// Query parameters dropped from every result URL.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source", "utm_medium", "utm_campaign", "utm_term", "utm_content",
    "fbclid", "gclid", "msclkid", "ref",
];

const ELLIPSIS: char = '…';

/// Normalized web result, serialized verbatim in json mode.
#[derive(Debug, Clone, Serialize)]
pub struct WebResult {
    pub title: String,
    pub snippet: String,
    pub url: String,
    pub hostname: String,
}

/// Normalized news result, serialized verbatim in json mode.
#[derive(Debug, Clone, Serialize)]
pub struct NewsResult {
    pub title: String,
    pub excerpt: String,
    pub url: String,
    pub source: String,
    pub date: String,
    pub relative_time: String,
}

/// Render a provider outcome for `web_search`.
pub fn render_web(cfg: &Config, query: &str, effective: u32, outcome: SearchOutcome<WebPage>) -> Result<String> {
    if outcome.no_results || outcome.results.is_empty() {
        return Ok(no_results_message(query));
    }
    let rows = normalize_web(cfg, effective, outcome.results);
    render(cfg.output, query, effective, &rows)
}

/// Render a provider outcome for `news_search`.
pub fn render_news(cfg: &Config, query: &str, effective: u32, outcome: SearchOutcome<NewsArticle>) -> Result<String> {
    if outcome.no_results || outcome.results.is_empty() {
        return Ok(no_results_message(query));
    }
    let rows = normalize_news(cfg, effective, outcome.results);
    render(cfg.output, query, effective, &rows)
}

pub fn no_results_message(query: &str) -> String {
    format!("No results found for \"{query}\".")
}

/// Normalization order matters: truncate the list first, then per result
/// strip the title, clip the body, strip the body, and sanitize the URL.
fn normalize_web(cfg: &Config, effective: u32, pages: Vec<WebPage>) -> Vec<WebResult> {
    pages
        .into_iter()
        .take(effective as usize)
        .map(|page| {
            let hostname = if page.hostname.is_empty() {
                host_of(&page.url)
            } else {
                page.hostname
            };
            WebResult {
                title: strip(cfg, page.title),
                snippet: strip(cfg, body_text(cfg, &page.snippet)),
                url: sanitize_url(&page.url),
                hostname,
            }
        })
        .collect()
}

fn normalize_news(cfg: &Config, effective: u32, articles: Vec<NewsArticle>) -> Vec<NewsResult> {
    articles
        .into_iter()
        .take(effective as usize)
        .map(|article| NewsResult {
            title: strip(cfg, article.title),
            excerpt: strip(cfg, body_text(cfg, &article.excerpt)),
            url: sanitize_url(&article.url),
            source: article.source,
            date: format_date(article.date),
            relative_time: article.relative_time,
        })
        .collect()
}

fn body_text(cfg: &Config, body: &str) -> String {
    if cfg.full_content {
        body.to_string()
    } else {
        clip(body, cfg.snippet_length)
    }
}

fn strip(cfg: &Config, text: String) -> String {
    if cfg.strip_emoji { strip_emoji(&text) } else { text }
}

/// Clip `text` to at most `cap` characters. Clipped output is exactly
/// `cap` characters long, ending in the ellipsis marker; shorter bodies
/// pass through untouched.
pub fn clip(text: &str, cap: usize) -> String {
    if cap == 0 || text.chars().count() <= cap {
        return text.to_string();
    }
    let mut out: String = text.chars().take(cap - 1).collect();
    out.push(ELLIPSIS);
    out
}

pub fn strip_emoji(text: &str) -> String {
    text.chars().filter(|&c| !is_emoji(c)).collect::<String>().trim().to_string()
}

fn is_emoji(c: char) -> bool {
    matches!(c as u32,
        0x1F000..=0x1F0FF   // mahjong, dominoes, playing cards
        | 0x1F100..=0x1F2FF // enclosed alphanumerics, regional indicators
        | 0x1F300..=0x1F5FF // pictographs
        | 0x1F600..=0x1F64F // emoticons
        | 0x1F680..=0x1F6FF // transport
        | 0x1F780..=0x1F7FF // geometric shapes extended
        | 0x1F900..=0x1F9FF // supplemental pictographs
        | 0x1FA00..=0x1FAFF // extended pictographs
        | 0x2600..=0x26FF   // misc symbols
        | 0x2700..=0x27BF   // dingbats
        | 0x2B00..=0x2BFF   // stars, heavy shapes
        | 0xFE0E..=0xFE0F   // variation selectors
        | 0x200D            // zero-width joiner
        | 0x20E3            // combining keycap
    )
}

/// Remove known tracking parameters, preserving the order of whatever
/// survives. A URL that fails to parse is passed through unsanitized.
pub fn sanitize_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_string();
    };
    let Some(query) = url.query() else {
        return url.to_string();
    };

    let kept: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.as_str()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        let rebuilt = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(kept)
            .finish();
        url.set_query(Some(&rebuilt));
    }
    url.to_string()
}

fn format_date(epoch: i64) -> String {
    chrono::DateTime::from_timestamp(epoch, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn host_of(raw: &str) -> String {
    Url::parse(raw)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

/// One renderable result line; keeps the render pipeline identical for
/// web and news rows.
trait ResultLine: Serialize {
    fn title(&self) -> &str;
    fn url(&self) -> &str;
    /// Everything after the title in dense mode: `body | source url [...]`.
    fn dense_tail(&self) -> String;
}

impl ResultLine for WebResult {
    fn title(&self) -> &str {
        &self.title
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn dense_tail(&self) -> String {
        format!("{} | {} {}", self.snippet, self.hostname, self.url)
    }
}

impl ResultLine for NewsResult {
    fn title(&self) -> &str {
        &self.title
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn dense_tail(&self) -> String {
        format!(
            "{} | {} {} | {} ({})",
            self.excerpt, self.source, self.url, self.date, self.relative_time
        )
    }
}

fn render<T: ResultLine>(mode: OutputMode, query: &str, requested: u32, rows: &[T]) -> Result<String> {
    match mode {
        OutputMode::Json => Ok(serde_json::to_string(rows)?),
        OutputMode::Minimal => Ok(rows
            .iter()
            .map(|r| format!("{}: {}", r.title(), r.url()))
            .collect::<Vec<_>>()
            .join("\n")),
        OutputMode::Dense => {
            let mut out = format!("Results for \"{}\" ({}/{}):\n", query, rows.len(), requested);
            for (idx, row) in rows.iter().enumerate() {
                out.push_str(&format!("[{}] {} | {}\n", idx + 1, row.title(), row.dense_tail()));
            }
            out.pop();
            Ok(out)
        }
    }
}

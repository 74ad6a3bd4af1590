use std::borrow::Cow;
use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, JsonObject, ListToolsResult,
    PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::Config;
use crate::ddg::types::WORLDWIDE_REGION;
use crate::ddg::{DdgClient, SearchOptions, SearchProvider};
use crate::error::{Result, ServerError};
use crate::limiter::RateLimiter;
use crate::output::{render_news, render_web};
use crate::tools::{NewsSearchParams, WebSearchParams};

pub const WEB_SEARCH_TOOL: &str = "web_search";
pub const NEWS_SEARCH_TOOL: &str = "news_search";

const WEB_SEARCH_DESCRIPTION: &str = r#"
Searches the web with DuckDuckGo and returns a compact text rendering of the results.

The `query` should be a clear, self-contained search query (max 400 characters).
`limit` caps the number of results (1-20); `count` is a legacy alias with lower precedence.
`safeSearch` selects content filtering: "strict", "moderate" (default) or "off".
`region` narrows results to a region code such as "us-en"; defaults to worldwide.
`time` restricts recency: "day", "week", "month", "year" or "all" (default).
"#;

const NEWS_SEARCH_DESCRIPTION: &str = r#"
Searches recent news with DuckDuckGo and returns a compact text rendering of the
results, including source, date and relative age.

The `query` should be a clear, self-contained search query (max 400 characters).
`limit` caps the number of results (1-20); `count` is a legacy alias with lower precedence.
`safeSearch` selects content filtering: "strict", "moderate" (default) or "off".
`time` restricts recency: "day", "week", "month", "year" or "all" (default).
"#;

pub struct SearchServer {
    config: Config,
    limiter: RateLimiter,
    provider: Arc<dyn SearchProvider>,
}

impl SearchServer {
    pub fn new(config: Config) -> Self {
        let provider = Arc::new(DdgClient::new());
        Self::with_provider(config, provider)
    }

    /// Construct with an explicit provider; the test seam.
    pub fn with_provider(config: Config, provider: Arc<dyn SearchProvider>) -> Self {
        let limiter = RateLimiter::new(config.per_second_limit, config.per_month_limit);
        Self { config, limiter, provider }
    }

    fn tools() -> Vec<Tool> {
        vec![
            tool(WEB_SEARCH_TOOL, WEB_SEARCH_DESCRIPTION, input_schema::<WebSearchParams>()),
            tool(NEWS_SEARCH_TOOL, NEWS_SEARCH_DESCRIPTION, input_schema::<NewsSearchParams>()),
        ]
    }

    /// Single dispatch boundary: every pipeline failure is rendered as an
    /// error-flagged text result here, never a protocol fault.
    pub(crate) async fn dispatch(&self, name: &str, arguments: Option<JsonObject>) -> CallToolResult {
        let outcome = match name {
            WEB_SEARCH_TOOL => self.run_web(arguments).await,
            NEWS_SEARCH_TOOL => self.run_news(arguments).await,
            other => Err(ServerError::UnknownTool(other.to_string())),
        };

        match outcome {
            Ok(text) => CallToolResult::success(vec![Content::text(text)]),
            Err(e) => {
                warn!("{name} failed: {e}");
                CallToolResult::error(vec![Content::text(e.to_string())])
            }
        }
    }

    async fn run_web(&self, arguments: Option<JsonObject>) -> Result<String> {
        let params: WebSearchParams = parse_params(arguments)?;
        let request = params.validate().map_err(ServerError::InvalidArguments)?;
        self.limiter.check()?;

        let effective = request.requested.unwrap_or(self.config.default_results);
        let opts = SearchOptions {
            safe_search: request.safe_search,
            region: request.region.clone(),
            time: request.time,
        };
        debug!("web_search query=\"{}\" effective_limit={}", request.query, effective);

        let outcome = self.provider.web(&request.query, &opts).await?;
        render_web(&self.config, &request.query, effective, outcome)
    }

    async fn run_news(&self, arguments: Option<JsonObject>) -> Result<String> {
        let params: NewsSearchParams = parse_params(arguments)?;
        let request = params.validate().map_err(ServerError::InvalidArguments)?;
        self.limiter.check()?;

        let effective = request.requested.unwrap_or(self.config.default_results);
        let opts = SearchOptions {
            safe_search: request.safe_search,
            region: WORLDWIDE_REGION.to_string(),
            time: request.time,
        };
        debug!("news_search query=\"{}\" effective_limit={}", request.query, effective);

        let outcome = self.provider.news(&request.query, &opts).await?;
        render_news(&self.config, &request.query, effective, outcome)
    }
}

fn parse_params<T: DeserializeOwned>(arguments: Option<JsonObject>) -> Result<T> {
    let args = arguments
        .ok_or_else(|| ServerError::InvalidArguments("Arguments must be an object".into()))?;
    serde_json::from_value(serde_json::Value::Object(args))
        .map_err(|e| ServerError::InvalidArguments(e.to_string()))
}

fn tool(name: &'static str, description: &'static str, schema: Arc<JsonObject>) -> Tool {
    Tool {
        name: Cow::Borrowed(name),
        title: None,
        description: Some(Cow::Borrowed(description)),
        input_schema: schema,
        output_schema: None,
        annotations: None,
        icons: None,
        meta: None,
    }
}

fn input_schema<T: JsonSchema>() -> Arc<JsonObject> {
    match serde_json::to_value(schemars::schema_for!(T)) {
        Ok(serde_json::Value::Object(map)) => Arc::new(map),
        _ => Arc::new(JsonObject::new()),
    }
}

impl ServerHandler for SearchServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "ddg-search".into(),
                title: None,
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                website_url: None,
            },
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: Self::tools(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<CallToolResult, McpError> {
        Ok(self.dispatch(&request.name, request.arguments).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddg::{NewsArticle, SearchOutcome, WebPage};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SpyProvider {
        calls: AtomicUsize,
        pages: Vec<WebPage>,
        articles: Vec<NewsArticle>,
    }

    impl SpyProvider {
        fn with_pages(pages: Vec<WebPage>) -> Arc<Self> {
            Arc::new(Self { calls: AtomicUsize::new(0), pages, articles: Vec::new() })
        }

        fn empty() -> Arc<Self> {
            Self::with_pages(Vec::new())
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SearchProvider for SpyProvider {
        async fn web(&self, _query: &str, _opts: &SearchOptions) -> Result<SearchOutcome<WebPage>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(SearchOutcome::of(self.pages.clone()))
        }

        async fn news(&self, _query: &str, _opts: &SearchOptions) -> Result<SearchOutcome<NewsArticle>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(SearchOutcome::of(self.articles.clone()))
        }
    }

    fn page(n: usize) -> WebPage {
        WebPage {
            title: format!("Title {n}"),
            snippet: format!("Snippet {n}"),
            url: format!("https://example.com/{n}"),
            hostname: "example.com".into(),
        }
    }

    fn args(value: serde_json::Value) -> Option<JsonObject> {
        match value {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        }
    }

    fn text_of(result: &CallToolResult) -> String {
        result
            .content
            .first()
            .and_then(|c| c.as_text())
            .map(|t| t.text.clone())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn invalid_arguments_never_reach_the_provider() {
        let provider = SpyProvider::empty();
        let server = SearchServer::with_provider(Config::default(), provider.clone());

        for bad in [
            json!({ "query": "" }),
            json!({ "query": "   " }),
            json!({ "query": "q".repeat(401) }),
            json!({ "query": "rust", "limit": 0 }),
            json!({ "query": "rust", "safeSearch": "paranoid" }),
        ] {
            let result = server.dispatch(WEB_SEARCH_TOOL, args(bad)).await;
            assert_eq!(result.is_error, Some(true));
        }
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn missing_argument_object_is_invalid() {
        let provider = SpyProvider::empty();
        let server = SearchServer::with_provider(Config::default(), provider.clone());
        let result = server.dispatch(WEB_SEARCH_TOOL, None).await;
        assert_eq!(result.is_error, Some(true));
        assert!(text_of(&result).contains("Invalid arguments"));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error_result_naming_the_tool() {
        let provider = SpyProvider::empty();
        let server = SearchServer::with_provider(Config::default(), provider.clone());
        let result = server.dispatch("image_search", args(json!({ "query": "cats" }))).await;
        assert_eq!(result.is_error, Some(true));
        assert!(text_of(&result).contains("image_search"));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn rate_limit_rejects_before_the_provider_call() {
        let provider = SpyProvider::with_pages(vec![page(1)]);
        let config = Config { per_second_limit: 1, ..Config::default() };
        let server = SearchServer::with_provider(config, provider.clone());

        let first = server.dispatch(WEB_SEARCH_TOOL, args(json!({ "query": "rust" }))).await;
        assert_ne!(first.is_error, Some(true));

        let second = server.dispatch(NEWS_SEARCH_TOOL, args(json!({ "query": "rust" }))).await;
        assert_eq!(second.is_error, Some(true));
        assert!(text_of(&second).contains("per second"));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn successful_search_renders_dense_output() {
        let provider = SpyProvider::with_pages(vec![page(1), page(2), page(3)]);
        let server = SearchServer::with_provider(Config::default(), provider.clone());

        let result = server
            .dispatch(WEB_SEARCH_TOOL, args(json!({ "query": "rust", "limit": 2 })))
            .await;
        assert_ne!(result.is_error, Some(true));

        let text = text_of(&result);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "Results for \"rust\" (2/2):");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("[1] Title 1"));
    }

    #[tokio::test]
    async fn provider_no_results_yields_the_fixed_message() {
        let provider = SpyProvider::empty();
        let server = SearchServer::with_provider(Config::default(), provider.clone());
        let result = server
            .dispatch(NEWS_SEARCH_TOOL, args(json!({ "query": "nothing" })))
            .await;
        assert_ne!(result.is_error, Some(true));
        assert_eq!(text_of(&result), "No results found for \"nothing\".");
    }

    #[tokio::test]
    async fn list_exposes_both_tool_schemas() {
        let tools = SearchServer::tools();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].name, WEB_SEARCH_TOOL);
        assert_eq!(tools[1].name, NEWS_SEARCH_TOOL);
        for t in &tools {
            let props = t.input_schema.get("properties").and_then(|v| v.as_object()).unwrap();
            assert!(props.contains_key("query"));
            assert!(props.contains_key("safeSearch"));
        }
        let web_props = tools[0].input_schema["properties"].as_object().unwrap();
        assert!(web_props.contains_key("region"));
    }
}

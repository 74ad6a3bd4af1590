use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Rate limit exceeded: {0} request(s) per second")]
    PerSecondLimit(u32),

    #[error("Monthly rate limit exceeded: {0} requests per month")]
    MonthlyLimit(u32),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Configuration invalid: {0}")]
    ConfigInvalid(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Search API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Max retries exceeded ({attempts} attempts): {last_error}")]
    MaxRetries { attempts: u32, last_error: String },

    #[error("Could not extract search token from provider response")]
    MissingToken,
}

pub type Result<T> = std::result::Result<T, ServerError>;

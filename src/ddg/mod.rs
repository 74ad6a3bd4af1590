pub mod client;
pub mod types;

pub use client::DdgClient;
pub use types::{NewsArticle, SearchOptions, SearchOutcome, WebPage};

use async_trait::async_trait;

use crate::error::Result;

/// Seam between the request pipeline and the search backend. The
/// dispatcher only ever talks to this trait, so tests can substitute a
/// recording provider.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn web(&self, query: &str, opts: &SearchOptions) -> Result<SearchOutcome<WebPage>>;

    async fn news(&self, query: &str, opts: &SearchOptions) -> Result<SearchOutcome<NewsArticle>>;
}

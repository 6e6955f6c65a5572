use crate::config::HarvestConfig;
use crate::error::{HarvestError, Result};
use crate::types::{QueryWindow, SearchPage};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response};
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::info;
use url::Url;

/// Where search pages and archives come from.
#[async_trait]
pub trait RepositorySource: Send + Sync {
    /// Fetch one page of search results for the given star window.
    async fn fetch_page(&self, window: QueryWindow, page: u32) -> Result<SearchPage>;

    /// Stream the archive at `url` into `dest`, returning the number of bytes written.
    async fn download_archive(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// Search qualifiers shared by every window of a run.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub languages: Vec<String>,
    pub qualifiers: Vec<String>,
}

impl SearchQuery {
    pub fn from_config(config: &HarvestConfig) -> Self {
        Self {
            languages: config.languages.clone(),
            qualifiers: config.qualifiers.clone(),
        }
    }

    /// Space separated `q` value, e.g. `language:C language:cpp stars:50..199999`.
    pub fn render(&self, window: QueryWindow) -> String {
        self.languages
            .iter()
            .map(|lang| format!("language:{}", lang))
            .chain(self.qualifiers.iter().cloned())
            .chain(std::iter::once(window.stars_qualifier()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub struct GitHubClient {
    client: Client,
    search_url: Url,
    query: SearchQuery,
    page_size: u32,
    token: Option<String>,
    token_in_query: bool,
}

impl GitHubClient {
    pub fn new(config: &HarvestConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent("Repo Harvester/0.1.0")
            .timeout(Duration::from_secs(300))
            .build()?;

        Ok(GitHubClient {
            client,
            search_url: Url::parse(&config.search_url)?,
            query: SearchQuery::from_config(config),
            page_size: config.page_size,
            token: config.token.clone(),
            token_in_query: config.token_in_query,
        })
    }

    /// Search URL for one page of a window, without credentials.
    pub fn page_url(&self, window: QueryWindow, page: u32) -> Url {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("q", &self.query.render(window))
            .append_pair("sort", "stars")
            .append_pair("order", "desc")
            .append_pair("per_page", &self.page_size.to_string())
            .append_pair("page", &page.to_string());
        url
    }

    async fn make_request(&self, url: &str, authorized: bool) -> Result<Response> {
        let shown = Url::parse(url)
            .map(|parsed| redacted(&parsed))
            .unwrap_or_else(|_| url.to_string());

        let mut request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github.v3+json");

        if authorized && !self.token_in_query {
            if let Some(token) = &self.token {
                request = request.header("Authorization", format!("token {}", token));
            }
        }

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::HttpStatus {
                status: status.as_u16(),
                url: shown,
            });
        }
        Ok(response)
    }
}

/// `url` with any `access_token` query parameter removed.
pub fn redacted(url: &Url) -> String {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "access_token")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut clean = url.clone();
    if kept.is_empty() {
        clean.set_query(None);
    } else {
        clean.query_pairs_mut().clear().extend_pairs(kept);
    }
    clean.to_string()
}

// reqwest errors print their URL, which may carry the token.
fn transport(e: reqwest::Error) -> HarvestError {
    HarvestError::Transport(e.without_url())
}

#[async_trait]
impl RepositorySource for GitHubClient {
    async fn fetch_page(&self, window: QueryWindow, page: u32) -> Result<SearchPage> {
        let mut url = self.page_url(window, page);
        info!(%url, "Query url");

        if self.token_in_query {
            if let Some(token) = &self.token {
                url.query_pairs_mut().append_pair("access_token", token);
            }
        }

        let body = self
            .make_request(url.as_str(), true)
            .await?
            .text()
            .await
            .map_err(transport)?;
        let parsed: SearchPage = serde_json::from_str(&body)?;
        Ok(parsed)
    }

    async fn download_archive(&self, url: &str, dest: &Path) -> Result<u64> {
        let response = self.make_request(url, false).await?;

        let mut file = File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(transport)?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }
}

#[async_trait]
impl<T: RepositorySource + ?Sized> RepositorySource for std::sync::Arc<T> {
    async fn fetch_page(&self, window: QueryWindow, page: u32) -> Result<SearchPage> {
        (**self).fetch_page(window, page).await
    }

    async fn download_archive(&self, url: &str, dest: &Path) -> Result<u64> {
        (**self).download_archive(url, dest).await
    }
}

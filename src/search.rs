//! Web search via the Google Custom Search JSON API.

use crate::config::SearchConfig;
use crate::error::{Classify, ErrorKind};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// The API returns at most 10 items per page
const API_MAX_RESULTS: usize = 10;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("search API key and engine id are required")]
    MissingCredentials,
    #[error("search API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("search request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid search endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("no results found for: {0}")]
    NoResults(String),
}

impl Classify for SearchError {
    fn kind(&self) -> ErrorKind {
        match self {
            SearchError::MissingCredentials => ErrorKind::Auth,
            _ => ErrorKind::Search,
        }
    }
}

/// One ranked search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
    /// Domain shown by the search engine
    #[serde(default)]
    pub display_link: String,
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Ranked results for `query`, in upstream order
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    display_link: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Google Custom Search client
pub struct GoogleSearchClient {
    client: Client,
    endpoint: Url,
    api_key: String,
    engine_id: String,
    max_results: usize,
}

impl GoogleSearchClient {
    pub fn new(
        api_key: impl Into<String>,
        engine_id: impl Into<String>,
        config: &SearchConfig,
    ) -> Result<Self, SearchError> {
        let api_key = api_key.into();
        let engine_id = engine_id.into();
        if api_key.trim().is_empty() || engine_id.trim().is_empty() {
            return Err(SearchError::MissingCredentials);
        }

        let endpoint = Url::parse(&format!(
            "{}/customsearch/v1",
            config.base_url.trim_end_matches('/')
        ))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            engine_id,
            max_results: config.max_results.clamp(1, API_MAX_RESULTS),
        })
    }

    /// Same client with a different result count
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.clamp(1, API_MAX_RESULTS);
        self
    }

    fn request_url(&self, query: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("key", &self.api_key)
            .append_pair("cx", &self.engine_id)
            .append_pair("q", query)
            .append_pair("num", &self.max_results.to_string());
        url
    }
}

#[async_trait]
impl WebSearch for GoogleSearchClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        tracing::debug!(query, num = self.max_results, "searching");

        let response = self.client.get(self.request_url(query)).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown error")
                        .to_string()
                });
            return Err(SearchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: SearchResponse = response.json().await?;
        let results: Vec<SearchResult> = parsed
            .items
            .into_iter()
            .filter(|item| !item.link.is_empty())
            .take(self.max_results)
            .map(|item| SearchResult {
                title: item.title,
                url: item.link,
                snippet: item.snippet,
                display_link: item.display_link,
            })
            .collect();

        if results.is_empty() {
            return Err(SearchError::NoResults(query.to_string()));
        }

        tracing::info!(query, count = results.len(), "search returned results");
        Ok(results)
    }
}

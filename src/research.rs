//! Summarisation pipelines.
//!
//! `summarise_page` handles a single URL. [`Researcher`] searches a topic,
//! summarises each result and consolidates the summaries.

use crate::agent::{self, AgentError, SourceSummary};
use crate::error::{Classify, ErrorKind};
use crate::llm::{LlmClient, LlmError};
use crate::scraper::{FetchError, PageSource};
use crate::search::{SearchError, SearchResult, WebSearch};
use crate::summary::{SummaryRequest, SummaryResult, SummarySettings};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;

/// Failure while summarising one page
#[derive(Error, Debug)]
pub enum PageError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Summary(#[from] AgentError),
}

impl Classify for PageError {
    fn kind(&self) -> ErrorKind {
        match self {
            PageError::Fetch(e) => e.kind(),
            PageError::Summary(e) => e.kind(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ResearchError {
    #[error("search failed: {0}")]
    Search(#[from] SearchError),
    #[error("none of the {total} sources could be summarised")]
    NoUsableSources { total: usize },
    #[error("research aborted: {0}")]
    Aborted(#[source] LlmError),
}

impl Classify for ResearchError {
    fn kind(&self) -> ErrorKind {
        match self {
            ResearchError::Search(e) => e.kind(),
            ResearchError::NoUsableSources { .. } => ErrorKind::Search,
            ResearchError::Aborted(e) => e.kind(),
        }
    }
}

/// A summarised single page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageReport {
    pub url: String,
    pub title: Option<String>,
    /// Characters extracted from the page before truncation
    pub source_chars: usize,
    pub truncated: bool,
    pub summary: SummaryResult,
    /// Fetch plus summarisation time
    pub total_elapsed: f64,
}

/// Fetch a page and summarise it. The model is never called if the fetch fails.
pub async fn summarise_page(
    pages: &dyn PageSource,
    llm: &dyn LlmClient,
    settings: &SummarySettings,
    url: &str,
) -> Result<PageReport, PageError> {
    let start = Instant::now();
    let content = pages.fetch(url).await?;
    tracing::info!(
        url,
        chars = content.text.chars().count(),
        truncated = content.truncated,
        "page fetched"
    );

    let request = SummaryRequest::new(content.text, settings);
    let summary = agent::summarize(llm, &request).await?;

    Ok(PageReport {
        url: content.url,
        title: content.title,
        source_chars: content.original_chars,
        truncated: content.truncated,
        summary,
        total_elapsed: start.elapsed().as_secs_f64(),
    })
}

/// What happened to one source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    Summarized(SummaryResult),
    Skipped { reason: String },
}

/// One search result and its outcome, in search-result order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceReport {
    /// Zero-based position in the search results
    pub index: usize,
    pub source: SearchResult,
    pub outcome: SourceOutcome,
}

impl SourceReport {
    pub fn summary(&self) -> Option<&SummaryResult> {
        match &self.outcome {
            SourceOutcome::Summarized(summary) => Some(summary),
            SourceOutcome::Skipped { .. } => None,
        }
    }
}

/// The result of one topic research run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchReport {
    pub query: String,
    pub timestamp: DateTime<Utc>,
    pub per_source: Vec<SourceReport>,
    /// `None` when consolidation failed
    pub consolidated: Option<SummaryResult>,
    pub consolidation_error: Option<String>,
    pub total_elapsed: f64,
    pub sources_processed: usize,
    pub sources_total: usize,
}

impl ResearchReport {
    /// Successful per-source summaries in search-result order
    pub fn summarized(&self) -> impl Iterator<Item = (&SearchResult, &SummaryResult)> {
        self.per_source
            .iter()
            .filter_map(|report| report.summary().map(|summary| (&report.source, summary)))
    }
}

/// Progress callbacks for a research run. All methods default to no-ops.
pub trait ResearchProgress: Send + Sync {
    fn on_search_started(&self, _query: &str) {}
    fn on_sources_found(&self, _sources: &[SearchResult]) {}
    fn on_source_started(&self, _index: usize, _total: usize, _source: &SearchResult) {}
    fn on_source_summarized(
        &self,
        _index: usize,
        _source: &SearchResult,
        _summary: &SummaryResult,
    ) {
    }
    fn on_source_skipped(&self, _index: usize, _source: &SearchResult, _reason: &str) {}
    fn on_consolidation_started(&self, _sources: usize) {}
    fn on_consolidation_finished(&self, _succeeded: bool) {}
}

/// Silent progress
pub struct NoProgress;

impl ResearchProgress for NoProgress {}

/// Research tuning
#[derive(Debug, Clone)]
pub struct ResearchOptions {
    /// Sources processed at once
    pub concurrency: usize,
    pub consolidation_max_tokens: u32,
}

impl Default for ResearchOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            consolidation_max_tokens: 1500,
        }
    }
}

/// Multi-source topic research
pub struct Researcher<'a> {
    search: &'a dyn WebSearch,
    pages: &'a dyn PageSource,
    llm: &'a dyn LlmClient,
    settings: SummarySettings,
    options: ResearchOptions,
}

impl<'a> Researcher<'a> {
    pub fn new(
        search: &'a dyn WebSearch,
        pages: &'a dyn PageSource,
        llm: &'a dyn LlmClient,
        settings: SummarySettings,
    ) -> Self {
        Self {
            search,
            pages,
            llm,
            settings,
            options: ResearchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ResearchOptions) -> Self {
        self.options = options;
        self
    }

    /// Search, summarise each source, then consolidate.
    ///
    /// A failing source is recorded as skipped and the run goes on, except for
    /// a rejected inference credential, which aborts the run.
    pub async fn run(
        &self,
        topic: &str,
        progress: &dyn ResearchProgress,
    ) -> Result<ResearchReport, ResearchError> {
        let start = Instant::now();
        let timestamp = Utc::now();

        progress.on_search_started(topic);
        let sources = self.search.search(topic).await?;
        progress.on_sources_found(&sources);
        let total = sources.len();

        // Results land in their own slot so completion order never matters
        let mut slots: Vec<Option<SourceOutcome>> = vec![None; total];
        let concurrency = self.options.concurrency.max(1);

        let mut in_flight = stream::iter(sources.iter().enumerate())
            .map(|(index, source)| async move {
                progress.on_source_started(index, total, source);
                let result =
                    summarise_page(self.pages, self.llm, &self.settings, &source.url).await;
                (index, result)
            })
            .buffer_unordered(concurrency);

        while let Some((index, result)) = in_flight.next().await {
            let source = &sources[index];
            let outcome = match result {
                Ok(page) => {
                    progress.on_source_summarized(index, source, &page.summary);
                    SourceOutcome::Summarized(page.summary)
                }
                Err(PageError::Summary(AgentError::Llm(err))) if err.kind() == ErrorKind::Auth => {
                    tracing::error!(url = %source.url, error = %err, "inference credential rejected");
                    return Err(ResearchError::Aborted(err));
                }
                Err(err) => {
                    let reason = err.to_string();
                    tracing::warn!(url = %source.url, %reason, "skipping source");
                    progress.on_source_skipped(index, source, &reason);
                    SourceOutcome::Skipped { reason }
                }
            };
            slots[index] = Some(outcome);
        }
        drop(in_flight);

        let per_source: Vec<SourceReport> = sources
            .into_iter()
            .zip(slots)
            .enumerate()
            .map(|(index, (source, outcome))| SourceReport {
                index,
                source,
                outcome: outcome.unwrap_or_else(|| SourceOutcome::Skipped {
                    reason: "not processed".to_string(),
                }),
            })
            .collect();

        let inputs: Vec<SourceSummary<'_>> = per_source
            .iter()
            .filter_map(|report| {
                report.summary().map(|summary| SourceSummary {
                    title: &report.source.title,
                    url: &report.source.url,
                    summary: &summary.final_summary,
                })
            })
            .collect();
        let processed = inputs.len();

        if processed == 0 {
            return Err(ResearchError::NoUsableSources { total });
        }

        progress.on_consolidation_started(processed);
        let consolidation = agent::consolidate(
            self.llm,
            topic,
            &inputs,
            &self.settings,
            self.options.consolidation_max_tokens,
        )
        .await;
        drop(inputs);

        let (consolidated, consolidation_error) = match consolidation {
            Ok(summary) => (Some(summary), None),
            Err(err) => {
                tracing::warn!(error = %err, "consolidation failed");
                (None, Some(err.to_string()))
            }
        };
        progress.on_consolidation_finished(consolidated.is_some());

        tracing::info!(
            topic,
            processed,
            total,
            consolidated = consolidated.is_some(),
            "research finished"
        );

        Ok(ResearchReport {
            query: topic.to_string(),
            timestamp,
            per_source,
            consolidated,
            consolidation_error,
            total_elapsed: start.elapsed().as_secs_f64(),
            sources_processed: processed,
            sources_total: total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::CompletionRequest;
    use crate::scraper::WebContent;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Serves canned pages; URLs without a page fail with a 404
    struct FakePages {
        pages: HashMap<String, String>,
        delays: HashMap<String, u64>,
    }

    impl FakePages {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, text)| (url.to_string(), text.to_string()))
                    .collect(),
                delays: HashMap::new(),
            }
        }

        fn with_delay(mut self, url: &str, millis: u64) -> Self {
            self.delays.insert(url.to_string(), millis);
            self
        }
    }

    #[async_trait]
    impl PageSource for FakePages {
        async fn fetch(&self, url: &str) -> Result<WebContent, FetchError> {
            if let Some(millis) = self.delays.get(url) {
                tokio::time::sleep(Duration::from_millis(*millis)).await;
            }
            match self.pages.get(url) {
                Some(text) => Ok(WebContent {
                    url: url.to_string(),
                    title: None,
                    text: text.clone(),
                    original_chars: text.chars().count(),
                    truncated: false,
                }),
                None => Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }

    /// Echoes the page text back as the summary; consolidation prompts are kept
    struct EchoLlm {
        calls: AtomicUsize,
        consolidation_prompts: Mutex<Vec<String>>,
        fail_consolidation: bool,
        fail_on: Option<(String, fn() -> LlmError)>,
    }

    impl EchoLlm {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                consolidation_prompts: Mutex::new(Vec::new()),
                fail_consolidation: false,
                fail_on: None,
            }
        }
    }

    #[async_trait]
    impl LlmClient for EchoLlm {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if request.prompt.contains("Source Summaries:") {
                self.consolidation_prompts
                    .lock()
                    .unwrap()
                    .push(request.prompt.clone());
                if self.fail_consolidation {
                    return Err(LlmError::Api {
                        status: 500,
                        message: "overloaded".to_string(),
                    });
                }
                return Ok("Thought Process:\nmerging\nFinal Summary:\n1. Overview".to_string());
            }
            if let Some((marker, make_err)) = &self.fail_on {
                if request.prompt.contains(marker.as_str()) {
                    return Err(make_err());
                }
            }
            let body = request.prompt.rsplit("---").next().unwrap_or("").trim();
            Ok(format!("Final Summary:\n1. {}", body))
        }
    }

    fn rate_limited() -> LlmError {
        LlmError::RateLimited {
            retry_after: None,
            message: "slow down".to_string(),
        }
    }

    fn unauthorized() -> LlmError {
        LlmError::Unauthorized {
            status: 401,
            message: "Invalid API Key".to_string(),
        }
    }

    struct FixedSearch(Vec<SearchResult>);

    #[async_trait]
    impl WebSearch for FixedSearch {
        async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
            if self.0.is_empty() {
                return Err(SearchError::NoResults(query.to_string()));
            }
            Ok(self.0.clone())
        }
    }

    fn result(n: usize) -> SearchResult {
        SearchResult {
            title: format!("Title {}", n),
            url: format!("https://site{}.example/", n),
            snippet: String::new(),
            display_link: format!("site{}.example", n),
        }
    }

    fn settings() -> SummarySettings {
        SummarySettings {
            model: "test-model".to_string(),
            max_length: 200,
            temperature: 0.7,
        }
    }

    #[tokio::test]
    async fn test_summarise_page_fetch_failure_skips_model() {
        let pages = FakePages::new(&[]);
        let llm = EchoLlm::new();

        let err = summarise_page(&pages, &llm, &settings(), "https://down.example/")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_summarise_page_success() {
        let pages = FakePages::new(&[("https://ok.example/", "page words")]);
        let llm = EchoLlm::new();

        let report = summarise_page(&pages, &llm, &settings(), "https://ok.example/")
            .await
            .unwrap();
        assert_eq!(report.summary.final_summary, "1. page words");
        assert_eq!(report.source_chars, 10);
        assert!(report.total_elapsed >= report.summary.elapsed_seconds);
    }

    #[tokio::test]
    async fn test_two_of_five_sources_fail() {
        let search = FixedSearch((1..=5).map(result).collect());
        let pages = FakePages::new(&[
            ("https://site1.example/", "one"),
            ("https://site3.example/", "three"),
            ("https://site5.example/", "five"),
        ]);
        let llm = EchoLlm::new();

        let report = Researcher::new(&search, &pages, &llm, settings())
            .run("topic", &NoProgress)
            .await
            .unwrap();

        assert_eq!(report.sources_processed, 3);
        assert_eq!(report.sources_total, 5);
        assert_eq!(report.per_source.len(), 5);
        assert!(matches!(
            report.per_source[1].outcome,
            SourceOutcome::Skipped { .. }
        ));
        assert!(report.consolidated.is_some());

        let prompts = llm.consolidation_prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        let prompt = &prompts[0];
        let one = prompt.find("Source 1: Title 1").unwrap();
        let three = prompt.find("Source 2: Title 3").unwrap();
        let five = prompt.find("Source 3: Title 5").unwrap();
        assert!(one < three && three < five);
        assert!(!prompt.contains("Title 2"));
        assert!(!prompt.contains("Title 4"));
        assert!(!prompt.contains("Source 4:"));
    }

    #[tokio::test]
    async fn test_parallel_run_keeps_search_order() {
        let search = FixedSearch((1..=4).map(result).collect());
        let pages = FakePages::new(&[
            ("https://site1.example/", "one"),
            ("https://site2.example/", "two"),
            ("https://site3.example/", "three"),
            ("https://site4.example/", "four"),
        ])
        .with_delay("https://site1.example/", 80)
        .with_delay("https://site2.example/", 40);
        let llm = EchoLlm::new();

        let report = Researcher::new(&search, &pages, &llm, settings())
            .with_options(ResearchOptions {
                concurrency: 4,
                consolidation_max_tokens: 500,
            })
            .run("topic", &NoProgress)
            .await
            .unwrap();

        let summaries: Vec<&str> = report
            .summarized()
            .map(|(_, summary)| summary.final_summary.as_str())
            .collect();
        assert_eq!(summaries, ["1. one", "1. two", "1. three", "1. four"]);
        for (i, source) in report.per_source.iter().enumerate() {
            assert_eq!(source.index, i);
        }
    }

    #[tokio::test]
    async fn test_all_sources_failing_skips_consolidation() {
        let search = FixedSearch((1..=3).map(result).collect());
        let pages = FakePages::new(&[]);
        let llm = EchoLlm::new();

        let err = Researcher::new(&search, &pages, &llm, settings())
            .run("topic", &NoProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, ResearchError::NoUsableSources { total: 3 }));
        assert_eq!(err.kind(), ErrorKind::Search);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_consolidation_failure_keeps_sources() {
        let search = FixedSearch((1..=2).map(result).collect());
        let pages = FakePages::new(&[
            ("https://site1.example/", "one"),
            ("https://site2.example/", "two"),
        ]);
        let mut llm = EchoLlm::new();
        llm.fail_consolidation = true;

        let report = Researcher::new(&search, &pages, &llm, settings())
            .run("topic", &NoProgress)
            .await
            .unwrap();
        assert!(report.consolidated.is_none());
        assert!(report
            .consolidation_error
            .as_deref()
            .unwrap()
            .contains("overloaded"));
        assert_eq!(report.sources_processed, 2);
    }

    #[tokio::test]
    async fn test_rate_limited_source_is_skipped() {
        let search = FixedSearch((1..=2).map(result).collect());
        let pages = FakePages::new(&[
            ("https://site1.example/", "one"),
            ("https://site2.example/", "throttled page"),
        ]);
        let mut llm = EchoLlm::new();
        llm.fail_on = Some(("throttled page".to_string(), rate_limited as fn() -> LlmError));

        let report = Researcher::new(&search, &pages, &llm, settings())
            .run("topic", &NoProgress)
            .await
            .unwrap();
        assert_eq!(report.sources_processed, 1);
        match &report.per_source[1].outcome {
            SourceOutcome::Skipped { reason } => assert!(reason.contains("rate limit")),
            other => panic!("expected skipped source, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rejected_credential_aborts_run() {
        let search = FixedSearch((1..=3).map(result).collect());
        let pages = FakePages::new(&[
            ("https://site1.example/", "rejected page"),
            ("https://site2.example/", "two"),
            ("https://site3.example/", "three"),
        ]);
        let mut llm = EchoLlm::new();
        llm.fail_on = Some(("rejected page".to_string(), unauthorized as fn() -> LlmError));

        let err = Researcher::new(&search, &pages, &llm, settings())
            .run("topic", &NoProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, ResearchError::Aborted(_)));
        assert_eq!(err.kind(), ErrorKind::Auth);
    }

    #[tokio::test]
    async fn test_search_failure_is_fatal() {
        let search = FixedSearch(Vec::new());
        let pages = FakePages::new(&[]);
        let llm = EchoLlm::new();

        let err = Researcher::new(&search, &pages, &llm, settings())
            .run("nothing", &NoProgress)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ResearchError::Search(SearchError::NoResults(_))
        ));
    }
}

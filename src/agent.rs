//! LLM agent module for summarisation and consolidation.
//!
//! Builds the prompts, times the call and splits the response into a
//! [`SummaryResult`].

pub use crate::summary::{SummaryRequest, SummaryResult};

use crate::error::{Classify, ErrorKind};
use crate::llm::{CompletionRequest, LlmClient, LlmError};
use crate::summary::SummarySettings;
use std::fmt::Write;
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("nothing to consolidate: no source produced a summary")]
    NothingToConsolidate,
}

impl Classify for AgentError {
    fn kind(&self) -> ErrorKind {
        match self {
            AgentError::Llm(e) => e.kind(),
            AgentError::NothingToConsolidate => ErrorKind::Search,
        }
    }
}

/// A summarised source handed to the consolidator
#[derive(Debug, Clone, Copy)]
pub struct SourceSummary<'a> {
    pub title: &'a str,
    pub url: &'a str,
    pub summary: &'a str,
}

/// Run the summarisation agent on the provided request
pub async fn summarize(
    llm: &dyn LlmClient,
    request: &SummaryRequest,
) -> Result<SummaryResult, AgentError> {
    let completion = CompletionRequest {
        model: request.model.clone(),
        prompt: summary_prompt(&request.text),
        max_tokens: request.max_length,
        temperature: request.temperature,
    };
    complete_timed(llm, &completion).await
}

/// Merge per-source summaries into one report.
///
/// Sources are labelled in the order given. Fails without calling the API when
/// `sources` is empty.
pub async fn consolidate(
    llm: &dyn LlmClient,
    topic: &str,
    sources: &[SourceSummary<'_>],
    settings: &SummarySettings,
    max_tokens: u32,
) -> Result<SummaryResult, AgentError> {
    if sources.is_empty() {
        return Err(AgentError::NothingToConsolidate);
    }

    let completion = CompletionRequest {
        model: settings.model.clone(),
        prompt: consolidation_prompt(topic, sources),
        max_tokens,
        temperature: settings.temperature,
    };
    complete_timed(llm, &completion).await
}

async fn complete_timed(
    llm: &dyn LlmClient,
    completion: &CompletionRequest,
) -> Result<SummaryResult, AgentError> {
    let start = Instant::now();
    let raw = llm.complete(completion).await?;
    let elapsed = start.elapsed().as_secs_f64();
    Ok(SummaryResult::from_response(&raw, elapsed))
}

fn summary_prompt(text: &str) -> String {
    format!(
        r#"Please summarize the following text concisely into 3 main points.

First, under the heading "Thought Process:", briefly explain how you are reading the content.
Then, under the heading "Final Summary:", give a numbered list of concise key points.

Key points to include:
- Main topics and themes
- Important facts and figures
- Key announcements or updates

---

{}"#,
        text
    )
}

fn consolidation_prompt(topic: &str, sources: &[SourceSummary<'_>]) -> String {
    let mut combined = format!("Topic: {}\n\nSource Summaries:\n\n", topic);
    for (idx, source) in sources.iter().enumerate() {
        let _ = write!(
            combined,
            "Source {}: {}\nURL: {}\n{}\n\n",
            idx + 1,
            source.title,
            source.url,
            source.summary
        );
    }

    format!(
        r#"Please create a comprehensive summary of the following research about '{topic}'.
First, explain your thought process for analyzing and structuring the information.
Then, provide a structured summary.

{combined}
Please structure your response as follows:

Thought Process:
- Explain how you're analyzing the sources
- Describe your approach to organizing the information
- Note any particular points of interest or challenges

Final Summary:
1. Overview
2. Key Findings
3. Different Perspectives (if any)
4. Conclusions"#
    )
}

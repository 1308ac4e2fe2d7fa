//! Summary types - the input and output of every summarisation call.

use crate::config::LlmConfig;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    /// Line-initial "Final Summary:" heading, tolerant of markdown decoration
    static ref FINAL_SUMMARY_HEADING: Regex =
        Regex::new(r"(?im)^[ \t]*(?:#{1,6}[ \t]*)?\**[ \t]*final summary[ \t]*\**[ \t]*:?[ \t]*\**[ \t]*:?")
            .expect("valid final summary regex");
    static ref THOUGHT_PROCESS_HEADING: Regex =
        Regex::new(r"(?i)^(?:#{1,6}[ \t]*)?\**[ \t]*thought process[ \t]*\**[ \t]*:?[ \t]*\**[ \t]*:?")
            .expect("valid thought process regex");
}

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Generation settings shared by every request of one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarySettings {
    pub model: String,
    /// Maximum number of tokens the model may generate
    pub max_length: u32,
    pub temperature: f32,
}

impl From<&LlmConfig> for SummarySettings {
    fn from(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_length: config.max_length,
            temperature: config.temperature,
        }
    }
}

/// One summarisation call.
#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub text: String,
    pub model: String,
    pub max_length: u32,
    pub temperature: f32,
}

impl SummaryRequest {
    pub fn new(text: impl Into<String>, settings: &SummarySettings) -> Self {
        Self {
            text: text.into(),
            model: settings.model.clone(),
            max_length: settings.max_length,
            temperature: settings.temperature,
        }
    }
}

/// The result of one summarisation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResult {
    /// Reasoning the model produced before its answer, if any
    pub thought_process: Option<String>,
    pub final_summary: String,
    /// Wall-clock duration of the API call
    pub elapsed_seconds: f64,
    /// Characters in `final_summary`
    pub char_count: usize,
}

impl SummaryResult {
    /// Build a result from raw model output
    pub fn from_response(raw: &str, elapsed_seconds: f64) -> Self {
        let (thought_process, final_summary) = split_response(raw);
        let char_count = final_summary.chars().count();
        Self {
            thought_process,
            final_summary,
            elapsed_seconds,
            char_count,
        }
    }
}

/// Split raw model output into an optional thought process and the final summary.
///
/// A leading `<think>` block and a line-initial "Final Summary:" heading are
/// both treated as delimiters. Without either, the whole output is the final
/// summary. The final summary is never empty for non-blank input.
pub fn split_response(raw: &str) -> (Option<String>, String) {
    let trimmed = raw.trim();
    let mut thoughts: Vec<String> = Vec::new();

    let mut rest = trimmed;
    if let Some(after_open) = rest.strip_prefix(THINK_OPEN) {
        if let Some(close) = after_open.find(THINK_CLOSE) {
            thoughts.push(after_open[..close].trim().to_string());
            rest = after_open[close + THINK_CLOSE.len()..].trim();
        }
    }

    let final_summary = match FINAL_SUMMARY_HEADING.find(rest) {
        Some(heading) => {
            let before = rest[..heading.start()].trim();
            let before = THOUGHT_PROCESS_HEADING.replace(before, "");
            thoughts.push(before.trim().to_string());
            rest[heading.end()..].trim()
        }
        None => rest,
    };

    if final_summary.is_empty() {
        return (None, trimmed.to_string());
    }

    let thought_process = thoughts
        .into_iter()
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    let thought_process = (!thought_process.is_empty()).then_some(thought_process);

    (thought_process, final_summary.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_with_headings() {
        let raw = "Thought Process:\n- The article covers chips.\n\nFinal Summary:\n1. Groq ships LPUs.\n2. Latency is low.";
        let (thought, summary) = split_response(raw);
        assert_eq!(thought.as_deref(), Some("- The article covers chips."));
        assert_eq!(summary, "1. Groq ships LPUs.\n2. Latency is low.");
    }

    #[test]
    fn test_split_without_delimiter() {
        let raw = "1. First point\n2. Second point";
        let (thought, summary) = split_response(raw);
        assert!(thought.is_none());
        assert_eq!(summary, raw);
    }

    #[test]
    fn test_split_markdown_heading() {
        let raw = "**Thought Process:**\nReading carefully.\n\n## **Final Summary:**\n1. Point";
        let (thought, summary) = split_response(raw);
        assert_eq!(thought.as_deref(), Some("Reading carefully."));
        assert_eq!(summary, "1. Point");
    }

    #[test]
    fn test_split_think_block() {
        let raw = "<think>\nLet me look at this.\n</think>\n\n1. Point one\n2. Point two";
        let (thought, summary) = split_response(raw);
        assert_eq!(thought.as_deref(), Some("Let me look at this."));
        assert_eq!(summary, "1. Point one\n2. Point two");
    }

    #[test]
    fn test_split_think_block_and_heading() {
        let raw = "<think>hidden</think>\nThought Process:\nvisible\nFinal Summary:\n1. Done";
        let (thought, summary) = split_response(raw);
        assert_eq!(thought.as_deref(), Some("hidden\n\nvisible"));
        assert_eq!(summary, "1. Done");
    }

    #[test]
    fn test_split_empty_tail_falls_back_to_full_text() {
        let raw = "Thought Process:\nI ran out of tokens.\nFinal Summary:";
        let (thought, summary) = split_response(raw);
        assert!(thought.is_none());
        assert_eq!(summary, raw);
    }

    #[test]
    fn test_heading_must_start_a_line() {
        let raw = "The final summary: is below\n1. Point";
        let (thought, summary) = split_response(raw);
        assert!(thought.is_none());
        assert_eq!(summary, raw);
    }

    #[test]
    fn test_result_counts_final_summary_chars() {
        let result = SummaryResult::from_response("Final Summary:\n1. Café", 1.5);
        assert_eq!(result.final_summary, "1. Café");
        assert_eq!(result.char_count, 7);
        assert_eq!(result.elapsed_seconds, 1.5);
    }
}

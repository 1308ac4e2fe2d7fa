//! User-facing error classes.
//!
//! Each module keeps its own `thiserror` enum. This module maps them onto the
//! small set of classes printed by the CLI.

use std::fmt;

/// The class of an unrecoverable error, as reported on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unreachable host, bad status or malformed URL
    Network,
    /// Page fetched but no extractable text
    Content,
    /// Missing or rejected credential
    Auth,
    /// Upstream throttling
    RateLimit,
    /// Search API failure, empty result set or nothing to consolidate
    Search,
    /// Any other inference API failure
    Model,
    /// Unreadable or invalid configuration
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "NetworkError",
            ErrorKind::Content => "ContentError",
            ErrorKind::Auth => "AuthError",
            ErrorKind::RateLimit => "RateLimitError",
            ErrorKind::Search => "SearchError",
            ErrorKind::Model => "ModelError",
            ErrorKind::Config => "ConfigError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by every module error that can reach the CLI.
pub trait Classify {
    fn kind(&self) -> ErrorKind;
}

/// Find the class of the first classifiable error in an `anyhow` chain.
pub fn classify(err: &anyhow::Error) -> Option<ErrorKind> {
    use crate::agent::AgentError;
    use crate::config::ConfigError;
    use crate::llm::LlmError;
    use crate::research::{PageError, ResearchError};
    use crate::scraper::FetchError;
    use crate::search::SearchError;

    err.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<ResearchError>() {
            Some(e.kind())
        } else if let Some(e) = cause.downcast_ref::<PageError>() {
            Some(e.kind())
        } else if let Some(e) = cause.downcast_ref::<AgentError>() {
            Some(e.kind())
        } else if let Some(e) = cause.downcast_ref::<LlmError>() {
            Some(e.kind())
        } else if let Some(e) = cause.downcast_ref::<FetchError>() {
            Some(e.kind())
        } else if let Some(e) = cause.downcast_ref::<SearchError>() {
            Some(e.kind())
        } else {
            cause.downcast_ref::<ConfigError>().map(|e| e.kind())
        }
    })
}

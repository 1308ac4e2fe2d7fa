//! # Synopsis
//!
//! A CLI for webpage summarisation and multi-source topic research using LLMs.
//!
//! ## Features
//!
//! - **Page summaries**: fetch a URL, extract its visible text and summarise it
//!   into numbered key points
//! - **Topic research**: search a topic, summarise every result and merge the
//!   summaries into one consolidated report
//! - **Reasoning aware**: a model's thought process is split from its answer
//!   and shown on request

pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod report;
pub mod research;
pub mod scraper;
pub mod search;
pub mod storage;
pub mod summary;
pub mod ui;

pub use config::Config;
pub use error::ErrorKind;
pub use llm::{GroqClient, LlmClient};
pub use research::{summarise_page, ResearchReport, Researcher};
pub use scraper::{Fetcher, PageSource};
pub use search::{GoogleSearchClient, WebSearch};
pub use summary::{SummaryRequest, SummaryResult, SummarySettings};

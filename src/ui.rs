//! Terminal interaction: prompts, spinners and research progress narration.

use crate::research::ResearchProgress;
use crate::search::SearchResult;
use crate::summary::SummaryResult;
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// What the interactive mode should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Summarise,
    Research,
}

/// Whether stdin can answer prompts
pub fn is_interactive() -> bool {
    atty::is(atty::Stream::Stdin)
}

/// Disable colour when stdout is redirected
pub fn configure_colors() {
    if !atty::is(atty::Stream::Stdout) {
        colored::control::set_override(false);
    }
}

pub fn print_banner(title: &str) {
    println!();
    println!("{}", title.bold().blue());
    println!("{}", "=".repeat(50));
    println!();
}

/// Ask which pipeline to run
pub fn choose_mode() -> dialoguer::Result<Mode> {
    let choice = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("What would you like to do?")
        .items(&["Summarise a web page", "Research a topic"])
        .default(0)
        .interact()?;
    Ok(if choice == 0 {
        Mode::Summarise
    } else {
        Mode::Research
    })
}

/// Prompt for a non-empty line of input
pub fn prompt_text(prompt: &str) -> dialoguer::Result<String> {
    let value: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("please enter a value")
            } else {
                Ok(())
            }
        })
        .interact_text()?;
    Ok(value.trim().to_string())
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// A spinner on stderr, hidden when stderr is not a terminal
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let bar = if atty::is(atty::Stream::Stderr) {
        ProgressBar::new_spinner()
    } else {
        ProgressBar::hidden()
    };
    bar.set_style(spinner_style());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar.set_message(message.into());
    bar
}

/// Narrates a research run with a spinner and one line per event
pub struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self {
            bar: spinner("Starting research..."),
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ResearchProgress for ConsoleProgress {
    fn on_search_started(&self, query: &str) {
        self.bar
            .set_message(format!("🔍 Searching for information about '{}'...", query));
    }

    fn on_sources_found(&self, sources: &[SearchResult]) {
        for source in sources {
            self.bar
                .println(format!("{} {}", "Found:".green(), source.title));
        }
    }

    fn on_source_started(&self, index: usize, total: usize, source: &SearchResult) {
        let label = if source.display_link.is_empty() {
            source.url.as_str()
        } else {
            source.display_link.as_str()
        };
        self.bar.set_message(format!(
            "📚 Processing source {}/{}: {}...",
            index + 1,
            total,
            label
        ));
    }

    fn on_source_summarized(&self, index: usize, source: &SearchResult, summary: &SummaryResult) {
        self.bar.println(format!(
            "{} source {} summarised in {:.2}s ({})",
            "✓".green(),
            index + 1,
            summary.elapsed_seconds,
            source.url
        ));
    }

    fn on_source_skipped(&self, _index: usize, source: &SearchResult, reason: &str) {
        self.bar.println(format!(
            "{} Could not process {}: {}",
            "Warning:".yellow(),
            source.url,
            reason
        ));
    }

    fn on_consolidation_started(&self, sources: usize) {
        self.bar.set_message(format!(
            "🤖 Generating consolidated summary from {} sources...",
            sources
        ));
    }

    fn on_consolidation_finished(&self, succeeded: bool) {
        if !succeeded {
            self.bar.println(format!(
                "{} consolidated summary unavailable",
                "Warning:".yellow()
            ));
        }
        self.bar.finish_and_clear();
    }
}

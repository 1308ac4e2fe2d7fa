//! Text rendering of summary and research reports.
//!
//! Everything here is pure: the functions build a `String` and never touch the
//! terminal. Colour codes come from `colored` and disappear when colouring is
//! switched off.

use crate::research::{PageReport, ResearchReport, SourceOutcome};
use crate::summary::{SummaryResult, SummarySettings};
use colored::Colorize;
use std::fmt::{self, Write};

const RULE_WIDTH: usize = 50;

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

/// Render the single-page report
pub fn format_page_report(
    settings: &SummarySettings,
    report: &PageReport,
    show_thinking: bool,
) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_page_report(&mut out, settings, report, show_thinking);
    out
}

/// Render the topic research report
pub fn format_research_report(
    settings: &SummarySettings,
    report: &ResearchReport,
    show_thinking: bool,
) -> String {
    let mut out = String::new();
    let _ = write_research_report(&mut out, settings, report, show_thinking);
    out
}

fn write_configuration(out: &mut String, settings: &SummarySettings) -> fmt::Result {
    writeln!(out, "{}", "Configuration:".bold())?;
    writeln!(out, "• Model: {}", settings.model.cyan())?;
    writeln!(out, "• Max Length: {}", settings.max_length.to_string().cyan())?;
    writeln!(out, "• Temperature: {}", settings.temperature.to_string().cyan())
}

fn write_page_report(
    out: &mut String,
    settings: &SummarySettings,
    report: &PageReport,
    show_thinking: bool,
) -> fmt::Result {
    write_configuration(out, settings)?;
    writeln!(out)?;
    writeln!(out, "{}", "Summary Results".bold().green())?;
    writeln!(out, "{}", rule())?;
    match &report.title {
        Some(title) => writeln!(out, "Source: {} ({})", title.bold(), report.url)?,
        None => writeln!(out, "Source: {}", report.url)?,
    }
    writeln!(out)?;

    write_summary(out, &report.summary, "📝 Summary:", show_thinking)?;

    writeln!(out)?;
    writeln!(out, "{}", "Statistics:".bold())?;
    write_elapsed(out, report.total_elapsed)?;
    writeln!(
        out,
        "• Summary Length: {} characters",
        report.summary.char_count.to_string().cyan()
    )?;
    if report.truncated {
        writeln!(
            out,
            "• Source Text: {} characters (truncated for the prompt)",
            report.source_chars.to_string().cyan()
        )?;
    } else {
        writeln!(
            out,
            "• Source Text: {} characters",
            report.source_chars.to_string().cyan()
        )?;
    }
    writeln!(out, "{}", rule())
}

fn write_research_report(
    out: &mut String,
    settings: &SummarySettings,
    report: &ResearchReport,
    show_thinking: bool,
) -> fmt::Result {
    writeln!(
        out,
        "{}",
        format!("Research Results: {}", report.query).bold().blue()
    )?;
    writeln!(out, "{}", rule())?;
    writeln!(out)?;
    write_configuration(out, settings)?;
    writeln!(out)?;

    writeln!(out, "{}", "Sources:".bold())?;
    for source in &report.per_source {
        let n = source.index + 1;
        match &source.outcome {
            SourceOutcome::Summarized(_) => writeln!(
                out,
                "  {} {}. {} ({})",
                "✓".green(),
                n,
                source.source.title,
                source.source.url
            )?,
            SourceOutcome::Skipped { reason } => {
                writeln!(
                    out,
                    "  {} {}. {} ({})",
                    "✗".red(),
                    n,
                    source.source.title,
                    source.source.url
                )?;
                writeln!(out, "      {} {}", "skipped:".yellow(), reason)?;
            }
        }
    }
    writeln!(out)?;

    match (&report.consolidated, &report.consolidation_error) {
        (Some(summary), _) => {
            write_summary(out, summary, "📚 Consolidated Summary:", show_thinking)?
        }
        (None, error) => {
            writeln!(out, "{}", "📚 Consolidated Summary:".bold())?;
            writeln!(
                out,
                "  {} {}",
                "Unavailable:".red(),
                error.as_deref().unwrap_or("consolidation did not run")
            )?;
        }
    }
    writeln!(out)?;

    writeln!(out, "{}", "Sources and Individual Summaries".bold())?;
    for (source, summary) in report.summarized() {
        writeln!(out)?;
        writeln!(out, "{} {}", "Source:".bold().cyan(), source.title)?;
        writeln!(out, "{}", source.url.underline())?;
        write_indented(out, &summary.final_summary)?;
    }
    writeln!(out)?;

    writeln!(out, "{}", "Research Statistics:".bold())?;
    write_elapsed(out, report.total_elapsed)?;
    writeln!(
        out,
        "• Sources Processed: {}",
        format!("{}/{}", report.sources_processed, report.sources_total).cyan()
    )?;
    writeln!(out, "{}", rule())
}

fn write_summary(
    out: &mut String,
    summary: &SummaryResult,
    heading: &str,
    show_thinking: bool,
) -> fmt::Result {
    if show_thinking {
        if let Some(thought) = &summary.thought_process {
            writeln!(out, "{}", "🧠 Thought Process:".bold())?;
            write_indented(out, thought)?;
            writeln!(out)?;
        }
    }
    writeln!(out, "{}", heading.bold())?;
    write_indented(out, &summary.final_summary)
}

fn write_elapsed(out: &mut String, seconds: f64) -> fmt::Result {
    writeln!(
        out,
        "• Processing Time: {} seconds",
        format!("{:.2}", seconds).cyan()
    )
}

fn write_indented(out: &mut String, text: &str) -> fmt::Result {
    for line in text.lines() {
        if line.trim().is_empty() {
            writeln!(out)?;
        } else {
            writeln!(out, "  {}", line)?;
        }
    }
    Ok(())
}

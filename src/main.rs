//! Synopsis CLI - webpage summarisation and topic research
//!
//! The application logic is contained in lib.rs, and this file is responsible
//! for parsing arguments and handling top-level errors.

use anyhow::{bail, Context};
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use synopsis::error::{self, ErrorKind};
use synopsis::llm::CompletionRequest;
use synopsis::report::{format_page_report, format_research_report};
use synopsis::research::ResearchOptions;
use synopsis::storage::ReportStore;
use synopsis::ui::{self, ConsoleProgress, Mode};
use synopsis::{
    summarise_page, Config, Fetcher, GoogleSearchClient, GroqClient, LlmClient, PageSource,
    Researcher, SummarySettings, WebSearch,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "synopsis")]
#[command(author, version, about = "Summarise web pages and research topics with LLMs", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Path to a synopsis.toml config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Model identifier to use
    #[arg(long, global = true)]
    model: Option<String>,
    /// Maximum length of each summary, in tokens
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..))]
    max_length: Option<u32>,
    /// Temperature for text generation (0.0 - 1.0)
    #[arg(long, global = true, value_parser = parse_temperature)]
    temperature: Option<f32>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarise a webpage by URL
    Summarise {
        /// URL to summarise (prompted for when omitted)
        #[arg(long)]
        url: Option<String>,
        /// Show the model's thought process
        #[arg(long)]
        show_thinking: bool,
        /// Show raw extracted text instead of summary
        #[arg(long)]
        raw: bool,
    },
    /// Research a topic across several search results
    Research {
        /// Topic to research (prompted for when omitted)
        #[arg(long)]
        topic: Option<String>,
        /// Maximum number of sources (1-10)
        #[arg(long)]
        max_sources: Option<usize>,
        /// Sources processed at once
        #[arg(long)]
        concurrency: Option<usize>,
        /// Show the model's thought process
        #[arg(long)]
        show_thinking: bool,
        /// Do not write the JSON report
        #[arg(long)]
        no_save: bool,
    },
    /// Verify the configured API credentials
    Check,
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);
    ui::configure_colors();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    // Progress is narrated by the UI, so only errors are logged by default
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("error"),
        1 => EnvFilter::new("warn"),
        2 => EnvFilter::new("info"),
        3 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let command = match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "synopsis", &mut std::io::stdout());
            return Ok(());
        }
        Some(command) => command,
        None => {
            ensure_interactive("choose a mode")?;
            match ui::choose_mode()? {
                Mode::Summarise => Commands::Summarise {
                    url: None,
                    show_thinking: false,
                    raw: false,
                },
                Mode::Research => Commands::Research {
                    topic: None,
                    max_sources: None,
                    concurrency: None,
                    show_thinking: false,
                    no_save: false,
                },
            }
        }
    };

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::load()?,
    };
    if let Some(model) = cli.model {
        config.llm.model = model;
    }
    if let Some(max_length) = cli.max_length {
        config.llm.max_length = max_length;
    }
    if let Some(temperature) = cli.temperature {
        config.llm.temperature = temperature;
    }

    match command {
        Commands::Summarise {
            url,
            show_thinking,
            raw,
        } => {
            config.validate()?;
            summarise(&config, url, show_thinking, raw).await
        }
        Commands::Research {
            topic,
            max_sources,
            concurrency,
            show_thinking,
            no_save,
        } => {
            if let Some(max_sources) = max_sources {
                config.search.max_results = max_sources;
            }
            if let Some(concurrency) = concurrency {
                config.research.concurrency = concurrency;
            }
            config.validate()?;
            research(&config, topic, show_thinking, !no_save).await
        }
        Commands::Check => {
            config.validate()?;
            check(&config).await
        }
        Commands::Completions { .. } => Ok(()),
    }
}

async fn summarise(
    config: &Config,
    url: Option<String>,
    show_thinking: bool,
    raw: bool,
) -> anyhow::Result<()> {
    ui::print_banner("Web Content Summarizer");

    let url = match url {
        Some(url) => url,
        None => {
            ensure_interactive("pass --url")?;
            ui::prompt_text("Enter the URL to summarize")?
        }
    };
    let fetcher = Fetcher::new(&config.fetch)?;

    if raw {
        let spinner = ui::spinner(format!("🌐 Fetching content from {}...", url));
        let content = fetcher.fetch(&url).await;
        spinner.finish_and_clear();
        let content = content?;

        let title = content.title.as_deref().unwrap_or("No title");
        println!("=== {} ===\n", title);
        println!("{}", content.text);
        println!(
            "\n--- Extracted {} characters{} ---",
            content.original_chars,
            if content.truncated { ", truncated" } else { "" }
        );
        return Ok(());
    }

    let llm = GroqClient::new(config.llm_api_key()?, &config.llm)?;
    let settings = SummarySettings::from(&config.llm);

    let spinner = ui::spinner(format!("🌐 Fetching and summarising {}...", url));
    let report = summarise_page(&fetcher, &llm, &settings, &url).await;
    spinner.finish_and_clear();
    let report = report.with_context(|| format!("summarising {}", url))?;

    print!("{}", format_page_report(&settings, &report, show_thinking));
    Ok(())
}

async fn research(
    config: &Config,
    topic: Option<String>,
    show_thinking: bool,
    save: bool,
) -> anyhow::Result<()> {
    ui::print_banner("Topic Research Tool");

    let topic = match topic {
        Some(topic) => topic,
        None => {
            ensure_interactive("pass --topic")?;
            ui::prompt_text("Enter the topic to research")?
        }
    };

    // All credentials are checked before any request goes out
    let llm = GroqClient::new(config.llm_api_key()?, &config.llm)?;
    let (search_key, engine_id) = config.search_credentials()?;
    let search = GoogleSearchClient::new(search_key, engine_id, &config.search)?;
    let fetcher = Fetcher::new(&config.fetch)?;
    let settings = SummarySettings::from(&config.llm);

    let researcher = Researcher::new(&search, &fetcher, &llm, settings.clone()).with_options(
        ResearchOptions {
            concurrency: config.research.concurrency,
            consolidation_max_tokens: config.research.consolidation_max_tokens,
        },
    );

    let progress = ConsoleProgress::new();
    let report = researcher.run(&topic, &progress).await;
    progress.finish();
    let report = report.with_context(|| format!("researching '{}'", topic))?;

    println!();
    print!("{}", format_research_report(&settings, &report, show_thinking));

    if save && config.output.save_research {
        match ReportStore::new(&config.output.dir).save(&report) {
            Ok(path) => println!(
                "\nResults saved to: {}",
                path.display().to_string().green()
            ),
            Err(err) => {
                tracing::warn!(error = %err, "failed to save research report");
                eprintln!("{} failed to save report: {}", "Warning:".yellow(), err);
            }
        }
    }
    Ok(())
}

async fn check(config: &Config) -> anyhow::Result<()> {
    ui::print_banner("Testing API Configuration");
    let mut failures = 0;

    match config.llm_api_key() {
        Ok(key) => {
            let llm = GroqClient::new(key, &config.llm)?;
            let request = CompletionRequest {
                model: config.llm.model.clone(),
                prompt: "Respond with just 'OK'".to_string(),
                max_tokens: 32,
                temperature: 0.1,
            };
            match llm.complete(&request).await {
                Ok(_) => println!(
                    "✅ Inference API is working (model: {})",
                    config.llm.model.cyan()
                ),
                Err(err) => {
                    failures += 1;
                    println!("❌ Inference API: {}", err);
                }
            }
        }
        Err(err) => {
            failures += 1;
            println!("❌ {}", err);
        }
    }

    match config.search_credentials() {
        Ok((key, engine_id)) => {
            println!("Search Engine ID: {}", engine_id.cyan());
            let search =
                GoogleSearchClient::new(key, engine_id, &config.search)?.with_max_results(1);
            match search.search("test").await {
                Ok(results) => println!(
                    "✅ Search API is working (top result: {})",
                    results[0].title
                ),
                Err(err) => {
                    failures += 1;
                    println!("❌ Search API: {}", err);
                }
            }
        }
        Err(err) => {
            failures += 1;
            println!("❌ {}", err);
        }
    }

    if failures > 0 {
        bail!("{} API check(s) failed", failures);
    }
    Ok(())
}

fn ensure_interactive(hint: &str) -> anyhow::Result<()> {
    if !ui::is_interactive() {
        bail!("stdin is not a terminal; {}", hint);
    }
    Ok(())
}

fn parse_temperature(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("`{}` is not a number", s))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{} is outside 0.0-1.0", value))
    }
}

fn report_error(err: &anyhow::Error) {
    let kind = error::classify(err);
    let label = kind.map(|k| k.as_str()).unwrap_or("Error");

    eprintln!("\n{} {:#}", format!("{}:", label).bold().red(), err);
    match kind {
        Some(ErrorKind::Auth) => eprintln!(
            "\n{}",
            "Tip: set GROQ_API_KEY (and GOOGLE_SEARCH_API_KEY / GOOGLE_SEARCH_ENGINE_ID for research) \
             in the environment, a .env file or synopsis.toml."
                .yellow()
        ),
        Some(ErrorKind::Network) => eprintln!(
            "\n{}",
            "Tip: make sure the URL is valid and reachable.".yellow()
        ),
        Some(ErrorKind::RateLimit) => eprintln!(
            "\n{}",
            "Tip: wait a moment, or lower --concurrency for research runs.".yellow()
        ),
        _ => {}
    }
}

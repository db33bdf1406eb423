use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use paper_fanout::config::{default_config_path, load_config, write_default_config, Config, LogFormat};
use paper_fanout::models::{QueryRequest, SourceType};
use paper_fanout::sources::{SemanticScholarSource, SourceOutcome};
use paper_fanout::utils::{is_terminal, papers_table, render_envelope, terminal_width, HttpClient};
use paper_fanout::Aggregator;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Paper Fanout - Search Semantic Scholar, arXiv and CORE at once
#[derive(Parser, Debug)]
#[command(name = "paper-fanout")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search Semantic Scholar, arXiv and CORE at once", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Log line format (defaults to the configured one)
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormatArg>,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Table on a terminal, JSON otherwise
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
}

impl OutputFormat {
    fn resolve(self) -> Self {
        match self {
            OutputFormat::Auto if is_terminal() => OutputFormat::Table,
            OutputFormat::Auto => OutputFormat::Json,
            other => other,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

/// Provider selector for single-source commands
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SourceArg {
    #[value(name = "semantic")]
    Semantic,
    #[value(name = "arxiv")]
    Arxiv,
    #[value(name = "core")]
    Core,
}

impl From<SourceArg> for SourceType {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Semantic => SourceType::SemanticScholar,
            SourceArg::Arxiv => SourceType::Arxiv,
            SourceArg::Core => SourceType::Core,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search every source, merge and page the results
    #[command(alias = "s")]
    Search {
        /// Topic to search for
        topic: String,

        /// Only keep papers published in this year
        #[arg(long, short)]
        year: Option<i32>,

        /// Page number (1-based)
        #[arg(long, short, default_value_t = 1)]
        page: usize,

        /// Papers per page (defaults to search.default_page_size)
        #[arg(long)]
        page_size: Option<usize>,
    },

    /// List one source's results without merging or paging
    Papers {
        /// Topic to search for
        #[arg(default_value = "machine learning")]
        topic: String,

        /// Source to query
        #[arg(long, short, value_enum, default_value_t = SourceArg::Semantic)]
        source: SourceArg,

        /// Maximum number of results
        #[arg(long, short, default_value_t = 50)]
        limit: usize,
    },

    /// Look up a paper's abstract on Semantic Scholar by title
    Abstract {
        /// Paper title
        title: String,

        /// Publication year, used to pick between same-titled papers
        #[arg(long, short)]
        year: Option<i32>,
    },

    /// List sources, whether they are configured, and their retry policy
    Sources,

    /// Show or create the configuration file
    Config {
        /// Write a configuration file with default values
        #[arg(long)]
        init: bool,

        /// Overwrite an existing file when used with --init
        #[arg(long, requires = "init")]
        force: bool,

        /// Print the default configuration file path
        #[arg(long)]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // `config --init` must work even when the existing file is broken
    if let Commands::Config { init: true, force, .. } = cli.command {
        let path = match &cli.config {
            Some(path) => path.clone(),
            None => default_config_path().context("No configuration directory on this platform")?,
        };
        write_default_config(&path, force)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;
    init_logging(&cli, &config);

    tokio::select! {
        result = run(cli, config) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted");
            std::process::exit(130);
        }
    }
}

/// Install the subscriber; RUST_LOG wins over flags, flags over the config file
fn init_logging(cli: &Cli, config: &Config) {
    let directive = if cli.quiet {
        "error".to_string()
    } else {
        match cli.verbose {
            0 => config.logging.level.clone(),
            1 => "paper_fanout=debug".to_string(),
            _ => "paper_fanout=trace".to_string(),
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&directive))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let format = cli.log_format.map(LogFormat::from).unwrap_or(config.logging.format);
    let (text, json) = match format {
        LogFormat::Text => (Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)), None),
        LogFormat::Json => (
            None,
            Some(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .init();
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    let output = cli.output.resolve();

    match cli.command {
        Commands::Search {
            topic,
            year,
            page,
            page_size,
        } => {
            let request = QueryRequest::new(topic)?
                .year(year)
                .page(page)?
                .page_size(page_size.unwrap_or(config.search.default_page_size))?;

            let aggregator = Aggregator::from_config(&config)?;
            let envelope = aggregator.search(&request).await?;

            match output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&envelope)?),
                _ => print!("{}", render_envelope(&envelope, terminal_width())),
            }
        }

        Commands::Papers { topic, source, limit } => {
            let source_type = SourceType::from(source);
            let aggregator = Aggregator::from_config(&config)?;
            let outcome = aggregator
                .search_source(source_type, &topic, limit)
                .await?
                .with_context(|| format!("Source not registered: {}", source_type.id()))?;

            let status = outcome.status();
            if let SourceOutcome::Failed(e) = &outcome {
                eprintln!("{} failed: {}", source_type.name(), e);
            }

            match output {
                OutputFormat::Json => {
                    let body = serde_json::json!({
                        "source": source_type,
                        "status": status,
                        "papers": outcome.papers(),
                    });
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                _ => {
                    if outcome.papers().is_empty() {
                        println!("No papers found.");
                    } else {
                        println!("{}", papers_table(outcome.papers(), terminal_width()));
                    }
                    println!("{}: {}", source_type.name(), status);
                }
            }
        }

        Commands::Abstract { title, year } => {
            let client = HttpClient::from_settings(&config.http)?;
            let semantic = SemanticScholarSource::from_config(client, &config);

            let Some(details) = semantic.lookup_abstract(&title, year).await? else {
                anyhow::bail!("No abstract found for \"{}\"", title.trim());
            };

            match output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&details)?),
                _ => {
                    println!("{}", details.title);
                    println!("  Authors: {}", details.authors.join(", "));
                    if let Some(year) = details.year {
                        println!("  Year: {}", year);
                    }
                    if let Some(venue) = &details.venue {
                        println!("  Venue: {}", venue);
                    }
                    println!("  Citations: {}", details.citation_count);
                    if let Some(pdf) = &details.open_access_pdf {
                        println!("  PDF: {}", pdf);
                    }
                    println!();
                    println!("{}", details.r#abstract);
                }
            }
        }

        Commands::Sources => {
            let aggregator = Aggregator::from_config(&config)?;
            for source in aggregator.registry().all() {
                let retry = source.retry_config();
                println!(
                    "{} - {} ({})",
                    source.id(),
                    source.name(),
                    if source.is_configured() { "configured" } else { "missing API key" }
                );
                println!(
                    "  Retries: {} on {:?}, backoff step {:?}, attempt timeout {:?}",
                    retry.max_retries, retry.retry_on, retry.backoff_step, retry.attempt_timeout
                );
            }
        }

        Commands::Config { path, .. } => {
            if path {
                match default_config_path() {
                    Some(path) => println!("{}", path.display()),
                    None => anyhow::bail!("No configuration directory on this platform"),
                }
                return Ok(());
            }

            let redacted = config.redacted();
            match output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&redacted)?),
                _ => print!("{}", redacted.to_toml()?),
            }
        }
    }

    Ok(())
}

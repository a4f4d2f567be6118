//! pagediff CLI
//!
//! Fetches each URL over plain HTTP and through headless Chrome, then
//! reports where the two versions disagree.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use pagediff::config::{load_or_default, Config};
use pagediff::notify;
use pagediff::run::run;
use pagediff::{DynamicFetcher, OutputFormat, Pipeline, SqliteStore, StaticFetcher, SummaryStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const BANNER: &str = r"
  ___  __ _  __ _  ___  __| (_)/ _|/ _|
 | '_ \/ _` |/ _` |/ _ \/ _` | | |_| |_
 | |_) | (_| | (_| |  __/ (_| | |  _|  _|
 | .__/\__,_|\__, |\___|\__,_|_|_| |_|
 |_|         |___/
";

#[derive(Parser)]
#[command(name = "pagediff")]
#[command(author = "RoyalBit Inc.")]
#[command(version)]
#[command(about = "Compare static and browser-rendered versions of web pages")]
#[command(long_about = "Fetches each URL twice (plain HTTP and headless Chrome), extracts title,\nmeta description and headings from both, and reports where they disagree.\n\nThe JSON report goes to stdout; logs go to stderr.")]
struct Cli {
    /// URLs to compare
    #[arg(value_name = "URL")]
    urls: Vec<String>,

    /// Path to JSON configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Report format
    #[arg(long, short, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Simultaneous browser instances (1-20)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=20))]
    concurrency: Option<u8>,

    /// SQLite database for the latest summaries
    #[arg(long, value_name = "PATH", env = "PAGEDIFF_DATABASE")]
    database: Option<PathBuf>,

    /// Do not persist summaries
    #[arg(long)]
    no_store: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Log as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Skip the startup banner
    #[arg(long)]
    no_banner: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet, cli.log_json);

    if !(cli.quiet || cli.no_banner) {
        eprintln!("{}", BANNER);
    }

    if cli.urls.is_empty() {
        Cli::command().print_help()?;
        println!("\nNo URLs provided.");
        return Ok(());
    }

    let mut config = load_or_default(cli.config.as_deref());
    apply_overrides(&mut config, &cli);

    for url in &cli.urls {
        if let Err(e) = url::Url::parse(url) {
            tracing::warn!("{} is not a valid URL ({}), it will fail to fetch", url, e);
        }
    }

    let pipeline = Pipeline::new(
        Arc::new(StaticFetcher::new(&config.static_fetch)?),
        Arc::new(DynamicFetcher::from_config(&config.dynamic_fetch)),
    );

    let mut store = if cli.no_store {
        None
    } else {
        open_store(Path::new(&config.database_path))
    };

    let client = reqwest::Client::builder()
        .user_agent(&config.static_fetch.user_agent)
        .build()
        .context("Failed to build notification client")?;
    let notifier = notify::from_config(&config.notify, client);

    tracing::info!(
        "Comparing {} URL{} ({} parallel renders)",
        cli.urls.len(),
        if cli.urls.len() == 1 { "" } else { "s" },
        config.dynamic_fetch.concurrency
    );

    let report = run(
        &cli.urls,
        &pipeline,
        store.as_mut().map(|s| s as &mut dyn SummaryStore),
        notifier.as_ref(),
    )
    .await;

    println!("{}", report.render(cli.format)?);

    Ok(())
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(concurrency) = cli.concurrency {
        config.dynamic_fetch.concurrency = concurrency as usize;
    }
    if let Some(database) = &cli.database {
        config.database_path = database.display().to_string();
    }
}

fn open_store(path: &Path) -> Option<SqliteStore> {
    match SqliteStore::open(path) {
        Ok(store) => Some(store),
        Err(e) => {
            tracing::error!("Failed to open database {}: {}", path.display(), e);
            None
        }
    }
}

/// Logs go to stderr so stdout carries only the report
fn setup_logging(verbose: u8, quiet: bool, json: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("pagediff=info,warn"),
            1 => EnvFilter::new("pagediff=debug,info"),
            2 => EnvFilter::new("pagediff=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

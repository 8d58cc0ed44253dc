//! Loadout - run feature loading passes from the command line
//!
//! `loadout fetch` runs a full pass against a headless page and reports
//! what would have been installed.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use loadout_core::cache::CacheStore;
use loadout_core::source::{ContentSource, DirectorySource, HttpSource, OfflineBundle};
use loadout_core::{CatalogManifest, FetchReport, Loader, Settings};

mod cache_cli;
mod catalog_cli;
mod headless;

use headless::{builtin_factories, ConsoleNotifier, HeadlessHost};

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "loadout",
    about = "Dependency-ordered feature loader with a version-gated cache",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Set log level
    #[clap(long, default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Emit logs as JSON
    #[clap(long, global = true)]
    json_logs: bool,

    /// Cache file (defaults to the platform cache directory)
    #[clap(long, global = true)]
    cache_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a full loading pass against a headless page
    Fetch {
        /// Catalog file (YAML or JSON)
        #[clap(long)]
        catalog: PathBuf,

        /// Settings file (JSON); defaults apply if it does not exist
        #[clap(long)]
        settings: Option<PathBuf>,

        /// Current build version, used to validate the cache
        #[clap(long = "build-version")]
        build_version: String,

        /// Resolve resource URLs against a local directory instead of the network
        #[clap(long, conflicts_with = "bundle")]
        source_dir: Option<PathBuf>,

        /// Use a prepackaged offline bundle (JSON map of URL to content)
        #[clap(long)]
        bundle: Option<PathBuf>,

        /// Enable an extra feature (repeatable)
        #[clap(long = "enable", value_name = "KEY")]
        enable: Vec<String>,

        /// Output the pass report as JSON
        #[clap(long)]
        json: bool,
    },

    /// Inspect and maintain the content cache
    Cache(cache_cli::CacheCommand),

    /// Inspect resource catalogs
    Catalog(catalog_cli::CatalogCommand),
}

fn initialize_tracing(log_level: &LogLevel, json_logs: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_filter_directive()));

    if json_logs {
        // JSON output for structured logs - MUST go to stderr
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_tracing(&cli.log_level, cli.json_logs);

    match cli.command {
        Command::Fetch {
            catalog,
            settings,
            build_version,
            source_dir,
            bundle,
            enable,
            json,
        } => {
            let options = FetchOptions {
                catalog,
                settings,
                build_version,
                source_dir,
                bundle,
                enable,
                json,
                cache_file: cli.cache_file,
            };
            fetch_command(options).await
        }
        Command::Cache(command) => command.execute(cli.cache_file).await,
        Command::Catalog(command) => command.execute().await,
    }
}

struct FetchOptions {
    catalog: PathBuf,
    settings: Option<PathBuf>,
    build_version: String,
    source_dir: Option<PathBuf>,
    bundle: Option<PathBuf>,
    enable: Vec<String>,
    json: bool,
    cache_file: Option<PathBuf>,
}

async fn fetch_command(options: FetchOptions) -> Result<()> {
    let manifest = CatalogManifest::from_file(&options.catalog)?;

    let mut settings = match &options.settings {
        Some(path) => Settings::load_from_path(path)?,
        None => Settings::default(),
    };
    for key in &options.enable {
        settings.set_feature(key, true);
    }

    let source = content_source(&options)?;
    let cache_store = cache_cli::cache_store(options.cache_file.clone())?;
    debug!("Using cache {}", cache_store.describe());

    let host = Arc::new(HeadlessHost::default());
    let loader = Loader::builder(manifest, options.build_version.as_str())
        .settings(settings)
        .source(source)
        .cache_store(Arc::new(cache_store))
        .host(host.clone())
        .notifier(Arc::new(ConsoleNotifier))
        .factories(builtin_factories())
        .build()
        .context("Failed to set up loader")?;

    let report = loader.fetch().await;
    info!("Pass {} finished", report.pass_id);

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, &host);
    }
    Ok(())
}

fn content_source(options: &FetchOptions) -> Result<Arc<dyn ContentSource>> {
    if let Some(path) = &options.bundle {
        return Ok(Arc::new(OfflineBundle::from_file(path)?));
    }
    if let Some(dir) = &options.source_dir {
        return Ok(Arc::new(DirectorySource::new(dir)));
    }
    // The loader enforces the download timeout
    Ok(Arc::new(HttpSource::new()?))
}

/// Table row for failed components
#[derive(Tabled)]
struct FailureRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Stage")]
    stage: &'static str,
    #[tabled(rename = "Error")]
    message: String,
}

fn print_report(report: &FetchReport, host: &HeadlessHost) {
    println!(
        "Pass {} for version {} (cache: {})",
        report.pass_id, report.version, report.cache
    );
    println!(
        "  {} component(s) executed in {} ms",
        report.executed.len(),
        report.duration_ms
    );

    let styles = host.styles();
    if !styles.is_empty() {
        println!("  {} style(s) applied", styles.len());
    }
    for widget in host.widgets() {
        println!("  widget: {widget}");
    }
    for (key, items) in host.dropdown_options() {
        println!("  dropdown {key}: {}", items.join(", "));
    }
    for key in &report.skipped_imports {
        println!("  skipped unregistered '{key}'");
    }
    for cycle in &report.cycles {
        println!("  dependency cycle: {}", cycle.join(" -> "));
    }

    let rows: Vec<FailureRow> = report
        .download_failures
        .iter()
        .map(|f| (f, "download"))
        .chain(report.execution_failures.iter().map(|f| (f, "execute")))
        .map(|(failure, stage)| FailureRow {
            name: failure.display_name.clone(),
            stage,
            message: failure.message.clone(),
        })
        .collect();

    if rows.is_empty() {
        println!("✓ All components loaded");
        return;
    }

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();
    println!("\n✗ {} component(s) failed:\n", rows.len());
    println!("{table}");
}

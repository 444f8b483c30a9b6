//! orgcloc - lines of code across a GitHub organization
//!
//! Lists every repository of an organization, shallow-clones them with
//! bounded concurrency, counts lines per language, caches the per-repository
//! results and prints an organization-wide report.
//!
//! Exit codes:
//!   0 - Success (individual repositories may still have failed)
//!   1 - Configuration error, listing failure or unwritable output

mod analysis;
mod cli;
mod config;
mod error;
mod models;
mod repo;
mod report;
mod scanner;

use analysis::{aggregate, Pipeline, PipelineOptions, RepositoryAnalyzer, RepositoryCache};
use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use models::RepositoryMetrics;
use repo::{GitFetcher, GitHubClient};
use scanner::{LineCounter, ScanConfig};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("orgcloc v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Run failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .orgcloc.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("Created {} with default settings.", CONFIG_FILE_NAME);
    Ok(())
}

/// Initialize logging on stderr based on verbosity settings.
fn init_logging(args: &Args) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level())
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = match args.config {
        Some(ref path) => {
            info!("Loading config from: {}", path.display());
            Config::load(path)?
        }
        None => match Config::load_default()? {
            Some(config) => {
                info!("Loaded default config from {}", CONFIG_FILE_NAME);
                config
            }
            None => {
                debug!("No config file found, using defaults");
                Config::default()
            }
        },
    };

    config.merge_with_args(args);
    config.validate()?;
    Ok(config)
}

/// Run the complete workflow.
async fn run(args: Args) -> Result<()> {
    let start_time = Instant::now();
    let config = load_config(&args)?;
    let cache = RepositoryCache::new(&config.general.cache_dir);

    // --offline: report every cached entry
    if args.offline {
        let organization = config.organization().unwrap_or("-").to_string();
        let repositories = load_cached(&cache)?;
        return write_report(&args, &organization, &repositories);
    }

    let credentials = config.credentials()?;
    let client = GitHubClient::new(
        &config.github.endpoint,
        &credentials.organization,
        &credentials.token,
        config.github.per_page,
        Duration::from_secs(config.github.request_timeout_seconds),
    )?;
    let locations = client.list_repositories().await?;

    if args.dry_run {
        for location in &locations {
            println!("{}", location);
        }
        eprintln!("{} repositories would be analyzed", locations.len());
        return Ok(());
    }

    let fetcher = GitFetcher::new(credentials.user.clone(), Some(credentials.token.clone()));
    let counter = LineCounter::new(ScanConfig::from(&config.scanner));
    let analyzer = RepositoryAnalyzer::new(
        &config.general.repos_dir,
        cache.clone(),
        Arc::new(fetcher),
        Arc::new(counter),
    )
    .with_prune_checkouts(config.general.prune_checkouts);

    let pipeline = Pipeline::new(
        analyzer,
        PipelineOptions {
            concurrency: config.general.concurrency,
            deadline: config.deadline(),
            show_progress: !args.quiet,
        },
    );

    let cancel = pipeline.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling outstanding work");
            cancel.cancel();
        }
    });

    let summary = pipeline
        .run(&locations)
        .await
        .context("Failed to prepare working directories")?;
    interrupt.abort();

    for failed in &summary.failed {
        if !failed.cancelled {
            warn!("{}: {}", failed.location, failed.error);
        }
    }
    if !summary.empty.is_empty() {
        info!("Skipped empty repositories: {}", summary.empty.join(", "));
    }
    eprintln!("analyzed: {}/{}", summary.processed.len(), summary.total);

    let repositories = load_cached(&cache)?;
    write_report(&args, &credentials.organization, &repositories)?;
    info!("Done in {:.1}s", start_time.elapsed().as_secs_f64());
    Ok(())
}

/// Every cached repository, including ones measured by earlier runs.
fn load_cached(cache: &RepositoryCache) -> Result<Vec<RepositoryMetrics>> {
    let repositories = cache.load_all().with_context(|| {
        format!("Failed to read cache directory {}", cache.dir().display())
    })?;
    info!("Loaded {} cached repositories", repositories.len());
    Ok(repositories)
}

/// Aggregate, render and write the report to stdout or --output.
fn write_report(args: &Args, organization: &str, repositories: &[RepositoryMetrics]) -> Result<()> {
    let aggregate = aggregate(repositories);

    let output = match args.format {
        OutputFormat::Text => report::render_text(organization, &aggregate, repositories),
        OutputFormat::Json => report::render_json(organization, &aggregate, repositories)?,
    };

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Report saved to {}", path.display());
        }
        None => print!("{}", output),
    }
    Ok(())
}

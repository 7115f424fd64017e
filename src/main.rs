use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cdn_invalidator::config::{
    AppConfig, CliConfig, FileConfig, DEFAULT_BULK_TIMEOUT_MS, DEFAULT_ENDPOINT,
    DEFAULT_REQUEST_TIMEOUT_SEC,
};
use cdn_invalidator::invalidation::{
    BatchScheduler, HttpInvalidationBackend, InvalidationBackend, NoOpBackend,
};
use cdn_invalidator::metrics;
use cdn_invalidator::resolver::PathResolver;

#[derive(Parser, Debug)]
struct CliArgs {
    /// Paths to invalidate. When none are given, requests are read from stdin,
    /// one per line: either whitespace-separated paths, or a JSON object
    /// `{"content_type": ..., "entry": {...}}` resolved through the configured
    /// content types.
    pub paths: Vec<String>,

    /// Path to a TOML config file. Its values override command line flags.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Default log level. `LOG_LEVEL` directives take precedence.
    #[clap(long, default_value_t = LevelFilter::INFO)]
    pub logging_level: LevelFilter,

    /// CDN distribution to invalidate. Without it nothing is sent (dry run).
    #[clap(long)]
    pub distribution_id: Option<String>,

    /// Base URL of the invalidation API.
    #[clap(long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Send every request on its own instead of grouping them.
    #[clap(long)]
    pub no_bulk: bool,

    /// Debounce window in milliseconds for grouped requests.
    #[clap(long, default_value_t = DEFAULT_BULK_TIMEOUT_MS)]
    pub bulk_timeout_ms: u64,

    /// Timeout in seconds for invalidation API requests.
    #[clap(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SEC)]
    pub request_timeout_sec: u64,

    /// Write Prometheus metrics to this file on exit.
    #[clap(long)]
    pub metrics_file: Option<PathBuf>,
}

/// A changed record, resolved to paths through its content type.
#[derive(Debug, Deserialize)]
struct EntryRequest {
    content_type: String,
    entry: serde_json::Value,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };

    let cli_config = CliConfig {
        logging_level: cli_args.logging_level,
        bulk: !cli_args.no_bulk,
        bulk_timeout_ms: cli_args.bulk_timeout_ms,
        distribution_id: cli_args.distribution_id.clone(),
        endpoint: cli_args.endpoint.clone(),
        request_timeout_sec: cli_args.request_timeout_sec,
        metrics_file: cli_args.metrics_file.clone(),
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(config.logging_level.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    if let Some(path) = &cli_args.config {
        info!("Loaded config file {:?}", path);
    }

    metrics::init_metrics();

    let settings = &config.invalidation;
    let backend: Arc<dyn InvalidationBackend> = match &settings.distribution_id {
        Some(distribution_id) => {
            let backend = HttpInvalidationBackend::new(
                settings.endpoint.clone(),
                distribution_id.clone(),
                settings.request_timeout_sec,
            )?;
            info!(
                "Invalidating distribution {} via {}",
                backend.distribution_id(),
                settings.endpoint
            );
            Arc::new(backend)
        }
        None => Arc::new(NoOpBackend),
    };

    let content_types = config.paths.content_types();
    if !content_types.is_empty() {
        info!("Resolving paths for content types: {}", content_types.join(", "));
    }

    let scheduler = BatchScheduler::new(settings.scheduler_settings(), backend);

    let run_result = if cli_args.paths.is_empty() {
        run(
            &scheduler,
            &config.paths,
            BufReader::new(tokio::io::stdin()),
        )
        .await
    } else {
        submit(&scheduler, cli_args.paths).await;
        stop(&scheduler).await;
        Ok(())
    };

    if let Some(path) = &config.metrics_file {
        std::fs::write(path, metrics::gather())
            .with_context(|| format!("Failed to write metrics file: {:?}", path))?;
    }

    run_result
}

/// Hand a request to the scheduler. Failures are logged, never propagated.
async fn submit(scheduler: &BatchScheduler, paths: Vec<String>) {
    if let Err(e) = scheduler.invalidate(paths).await {
        warn!("Invalidation request failed: {}", e);
    }
}

async fn submit_entry(scheduler: &BatchScheduler, resolver: &PathResolver, line: &str) {
    let request: EntryRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            warn!("Ignoring malformed entry request: {}", e);
            return;
        }
    };

    match resolver
        .invalidate_entry(scheduler, &request.content_type, &request.entry)
        .await
    {
        Ok(paths) if paths.is_empty() => {
            warn!("No paths to invalidate for content type {}", request.content_type)
        }
        Ok(_) => {}
        Err(e) => warn!("Invalidation request failed: {}", e),
    }
}

async fn stop(scheduler: &BatchScheduler) {
    if let Err(e) = scheduler.shutdown().await {
        error!("Final invalidation flush failed: {}", e);
    }
}

/// Feed `input` to the scheduler, then shut it down.
///
/// The scheduler is stopped, and pending paths flushed, even when reading
/// fails; the read error is returned afterwards.
async fn run<R>(scheduler: &BatchScheduler, resolver: &PathResolver, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let read_result = read_requests(scheduler, resolver, input).await;
    if let Err(e) = &read_result {
        error!("Stopping after input error: {:#}", e);
    }
    stop(scheduler).await;
    read_result
}

/// Feed input lines to the scheduler until EOF or Ctrl-C.
async fn read_requests<R>(scheduler: &BatchScheduler, resolver: &PathResolver, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("Failed to read from stdin")? {
                    Some(line) => {
                        let line = line.trim();
                        if line.starts_with('{') {
                            submit_entry(scheduler, resolver, line).await;
                            continue;
                        }
                        let paths: Vec<String> =
                            line.split_whitespace().map(str::to_string).collect();
                        if !paths.is_empty() {
                            submit(scheduler, paths).await;
                        }
                    }
                    None => {
                        info!("End of input, stopping");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl-C, stopping");
                break;
            }
        }
    }

    Ok(())
}

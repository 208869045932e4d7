//! epgfeed - gzipped XMLTV feed server for Magenta TV Austria.

/// Application configuration (TOML).
mod config;
/// HTTP surface.
mod http;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::instrument;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use url::Url;

use crate::config::{AppConfig, resolve_config_path};
use epgfeed_api::magenta::MagentaClient;
use epgfeed_core::remap::ChannelIdRemapTable;
use epgfeed_core::{RegenerationController, RegenerationOptions, RunOutcome};

/// CLI argument parser.
#[derive(Parser)]
#[command(about, version)]
struct Cli {
    /// Override config/data directory.
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Serve the feed over HTTP, regenerating it on demand.
    Serve,
    /// Generate the feed once and exit.
    Generate,
}

/// Builds the Magenta client from config.
#[instrument(skip_all)]
fn build_client(config: &AppConfig) -> Result<MagentaClient> {
    let mut builder =
        MagentaClient::builder().timeout(Duration::from_secs(config.upstream.timeout_secs));
    if let Some(url) = &config.upstream.landing_url {
        let url = Url::parse(url).with_context(|| format!("invalid landing URL {url}"))?;
        builder = builder.landing_url(url);
    }
    if let Some(url) = &config.upstream.api_base_url {
        let url = Url::parse(url).with_context(|| format!("invalid API base URL {url}"))?;
        builder = builder.api_base_url(url);
    }
    builder.build().context("failed to build upstream client")
}

/// Loads the channel-id remap table when remapping is enabled.
fn load_remap_table(config: &AppConfig) -> Result<Option<ChannelIdRemapTable>> {
    if !config.feed.map_channel_ids_to_a1 {
        return Ok(None);
    }
    let table = match &config.feed.a1_channel_map {
        Some(path) => ChannelIdRemapTable::from_path(path)
            .with_context(|| format!("failed to load remap table {}", path.display()))?,
        None => ChannelIdRemapTable::bundled().context("failed to load bundled remap table")?,
    };
    tracing::info!(entries = table.len(), "channel-id remapping enabled");
    Ok(Some(table))
}

/// Resolves the data directory against `--dir` when it is relative.
fn resolve_data_dir(dir: Option<&PathBuf>, data_dir: &Path) -> PathBuf {
    match dir {
        Some(d) if data_dir.is_relative() => d.join(data_dir),
        _ => data_dir.to_path_buf(),
    }
}

/// Builds the regeneration controller from config.
#[instrument(skip_all)]
fn build_controller(
    config: &AppConfig,
    dir: Option<&PathBuf>,
) -> Result<RegenerationController<MagentaClient>> {
    let client = build_client(config)?;
    let options = RegenerationOptions {
        staleness: chrono::Duration::hours(config.feed.staleness_hours),
        lease_ttl: chrono::Duration::minutes(config.feed.lock_ttl_minutes),
        cache_ttl: chrono::Duration::hours(config.cache.ttl_hours),
        fetch_concurrency: config.upstream.fetch_concurrency,
        remap: load_remap_table(config)?,
    };
    let data_dir = resolve_data_dir(dir, &config.feed.data_dir);
    RegenerationController::new(client, &data_dir, options)
        .with_context(|| format!("failed to open data directory {}", data_dir.display()))
}

/// Runs the `serve` subcommand.
///
/// # Errors
///
/// Returns an error if the controller fails to build or the listener cannot
/// be bound.
#[instrument(skip_all)]
async fn run_serve(config: &AppConfig, dir: Option<&PathBuf>) -> Result<()> {
    let controller = build_controller(config, dir)?;
    let app = http::router(Arc::new(controller));

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    tracing::info!(addr = %config.server.bind, "listening");

    axum::serve(listener, app).await.context("server failed")
}

/// Runs the `generate` subcommand.
///
/// # Errors
///
/// Returns an error if the controller fails to build or the pipeline fails.
#[instrument(skip_all)]
async fn run_generate(config: &AppConfig, dir: Option<&PathBuf>) -> Result<()> {
    let controller = build_controller(config, dir)?;
    match controller.run_now().await? {
        RunOutcome::Regenerated => {
            tracing::info!(path = %controller.feed_path().display(), "feed generated");
        }
        RunOutcome::InProgress => {
            tracing::info!("another regeneration holds the lease, nothing to do");
        }
        RunOutcome::Fresh => {}
    }
    Ok(())
}

/// Entry point.
///
/// # Errors
///
/// Returns an error if subcommand execution fails.
#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let config_path = resolve_config_path(cli.dir.as_ref()).context("failed to resolve config path")?;
    let config = AppConfig::load(&config_path).context("failed to load config")?;

    match cli.command {
        Commands::Serve => run_serve(&config, cli.dir.as_ref()).await,
        Commands::Generate => run_generate(&config, cli.dir.as_ref()).await,
    }
}

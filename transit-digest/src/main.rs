use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use tracing::{error, info};

use transit_digest::DigestError;
use transit_digest::config::{DigestConfig, ENV_OUTPUT_DIR, ENV_SOURCES};
use transit_digest::fetch::{FetcherConfig, HttpFetcher};
use transit_digest::pipeline::{digest, prefetch_sources};
use transit_digest::snapshot::Snapshot;
use transit_digest::source::load_catalogue;

/// Catalogue location when none is configured.
const DEFAULT_SOURCES: &str = "sources.json";

/// Snapshot directory when none is configured.
const DEFAULT_OUTPUT_DIR: &str = "gen";

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("transit_digest=info"));
    fmt().with_env_filter(env_filter).with_target(false).init();
}

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
        .into()
}

async fn run() -> Result<(), DigestError> {
    let config = DigestConfig::from_env()?;
    let sources_path = env_path(ENV_SOURCES, DEFAULT_SOURCES);
    let output_dir = env_path(ENV_OUTPUT_DIR, DEFAULT_OUTPUT_DIR);

    let sources = load_catalogue(&sources_path)?;
    info!(catalogue = ?sources_path, sources = sources.len(), "loaded source catalogue");

    let fetcher = HttpFetcher::new(
        FetcherConfig::new(config.max_download_attempts).with_timeout(config.fetch_timeout_secs),
    )?;
    prefetch_sources(&sources, &config, &fetcher).await;

    let network = digest(&sources, config, fetcher, Utc::now()).await?;
    Snapshot::new(output_dir).write(&network)?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(DigestError::Consistency(e)) => {
            error!(line = %e.line, defect = %e.defect, "network is inconsistent; nothing published");
            eprintln!("{}", e.report);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!(error = %e, "digestion failed");
            ExitCode::FAILURE
        }
    }
}

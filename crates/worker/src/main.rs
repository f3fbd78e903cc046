//! hirafi-sw entry point.
//!
//! Runs the offline cache controller behind a JSON-lines protocol on stdio.
//! Logging goes to stderr so it never mixes with protocol output on stdout.

use std::sync::Arc;

use anyhow::Result;
use hirafi_client::{FetchConfig, HttpFetcher};
use hirafi_core::{AppConfig, CacheDb};
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

mod controller;
mod handlers;
mod host;
mod platform;
#[cfg(test)]
mod testing;

use controller::WorkerConfig;
use host::Host;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(origin = %config.origin, db = %config.db_path.display(), "starting hirafi-sw on stdio");

    let db = CacheDb::open(&config.db_path).await?;
    let fetcher = HttpFetcher::new(FetchConfig::from(&config))?;
    let worker_config = WorkerConfig::from_app(&config)?;

    let host = Host::new(worker_config, db, Arc::new(fetcher));
    host.run(BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;

    tracing::info!("input closed, shutting down");
    Ok(())
}

//! `beachfront-worker` -- headless Beachfront job tracker.
//!
//! Restores the persisted job cache, sweeps running jobs against the
//! Piazza gateway on a fixed interval, and persists every state change
//! until interrupted.
//!
//! # Environment variables
//!
//! | Variable              | Required | Default         | Description                       |
//! |-----------------------|----------|-----------------|-----------------------------------|
//! | `PIAZZA_URL`          | yes      | --              | Gateway base URL                  |
//! | `PIAZZA_API_KEY`      | no       | --              | Basic-auth username               |
//! | `JOB_STORE_DIR`       | no       | `./.beachfront` | Directory of the job cache file   |
//! | `SESSION_KEY`         | no       | `jobs`          | Job cache key (file name)         |
//! | `SWEEP_INTERVAL_SECS` | no       | `15`            | Seconds between sweeps            |
//! | `JOB_TTL_SECS`        | no       | `7200`          | Seconds before a job times out    |
//! | `LOG_FORMAT`          | no       | `text`          | `json` for structured log lines   |

mod config;

use std::sync::Arc;

use beachfront_jobs::store::FileJobStore;
use beachfront_jobs::tracker::JobTracker;
use beachfront_piazza::api::PiazzaApi;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::WorkerConfig;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "beachfront_jobs=info,beachfront_worker=info".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    let config = WorkerConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    tracing::info!(
        piazza_url = %config.piazza_url,
        store_dir = %config.store_dir.display(),
        session_key = %config.tracker.session_key,
        sweep_interval_secs = config.tracker.sweep_interval.as_secs(),
        "Starting beachfront-worker",
    );

    let client = Arc::new(PiazzaApi::new(config.piazza_url, config.api_key));
    let store = Arc::new(FileJobStore::new(config.store_dir));
    let (tracker, sweep) = JobTracker::initialize(client, store, config.tracker).await;

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }

    tracing::info!("Shutdown requested, waiting for in-flight sweep");
    sweep.join().await;

    let jobs = tracker.list().await;
    tracing::info!(
        tracked = jobs.len(),
        running = jobs.iter().filter(|j| j.is_running()).count(),
        "beachfront-worker stopped",
    );
}

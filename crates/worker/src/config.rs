use std::path::PathBuf;

use beachfront_jobs::config::{env_or, env_required, ConfigError, TrackerConfig};

/// Default directory of the file-backed job store.
const DEFAULT_STORE_DIR: &str = "./.beachfront";

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Base URL of the Piazza gateway.
    pub piazza_url: String,
    /// API key sent as the basic-auth username, if any.
    pub api_key: Option<String>,
    /// Directory holding the persisted job cache.
    pub store_dir: PathBuf,
    pub tracker: TrackerConfig,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var           | Default          |
    /// |-------------------|------------------|
    /// | `PIAZZA_URL`      | required         |
    /// | `PIAZZA_API_KEY`  | unset            |
    /// | `JOB_STORE_DIR`   | `./.beachfront`  |
    ///
    /// Tracker settings come from [`TrackerConfig::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            piazza_url: env_required("PIAZZA_URL")?,
            api_key: std::env::var("PIAZZA_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            store_dir: PathBuf::from(env_or("JOB_STORE_DIR", DEFAULT_STORE_DIR)),
            tracker: TrackerConfig::from_env()?,
        })
    }
}

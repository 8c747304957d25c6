use std::time::Duration;

/// Default interval between background sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(15);

/// Default time a job may stay running before it is marked timed out.
pub const DEFAULT_JOB_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Default storage key of the persisted job cache.
pub const DEFAULT_SESSION_KEY: &str = "jobs";

/// Tracker configuration.
///
/// All fields have defaults suitable for interactive use. Override via
/// environment variables with [`TrackerConfig::from_env`].
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Interval between background sweeps (default: 15 s).
    pub sweep_interval: Duration,
    /// Running time after which a job is marked timed out (default: 2 h).
    pub job_ttl: Duration,
    /// Storage key under which the job cache is persisted.
    pub session_key: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            job_ttl: DEFAULT_JOB_TTL,
            session_key: DEFAULT_SESSION_KEY.to_string(),
        }
    }
}

impl TrackerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var               | Default |
    /// |-----------------------|---------|
    /// | `SWEEP_INTERVAL_SECS` | `15`    |
    /// | `JOB_TTL_SECS`        | `7200`  |
    /// | `SESSION_KEY`         | `jobs`  |
    pub fn from_env() -> Result<Self, ConfigError> {
        let sweep_interval = env_secs("SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL)?;
        if sweep_interval.is_zero() {
            return Err(ConfigError::Invalid {
                var: "SWEEP_INTERVAL_SECS",
                value: "0".into(),
            });
        }

        Ok(Self {
            sweep_interval,
            job_ttl: env_secs("JOB_TTL_SECS", DEFAULT_JOB_TTL)?,
            session_key: env_or("SESSION_KEY", DEFAULT_SESSION_KEY),
        })
    }
}

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{var} has invalid value {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Read `var`, falling back to `default` when unset.
pub fn env_or(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.into())
}

/// Read a required variable.
pub fn env_required(var: &'static str) -> Result<String, ConfigError> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(var))
}

/// Read a whole number of seconds, falling back to `default` when unset.
pub fn env_secs(var: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    match std::env::var(var) {
        Ok(value) => parse_secs(var, &value),
        Err(_) => Ok(default),
    }
}

fn parse_secs(var: &'static str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| ConfigError::Invalid {
            var,
            value: value.to_string(),
        })
}

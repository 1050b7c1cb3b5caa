//! Worker settings from the environment.
//!
//! | Var                       | Default                  |
//! |---------------------------|--------------------------|
//! | `WORKER_NAME`             | `<hostname>-<pid>`       |
//! | `WORKER_QUEUES`           | `dispatchers,git-import` |
//! | `WORKER_CONCURRENCY`      | `4`                      |
//! | `WORKER_POLL_INTERVAL_MS` | `1000`                   |
//! | `WORKER_PAUSED`           | `false`                  |
//! | `DISPATCH_INTERVAL_SECS`  | `300` (`0` disables)     |
//! | `STALE_JOB_SECS`          | `3600`                   |
//! | `GIT_BINARY`              | `git`                    |
//! | `GIT_TIMEOUT_SECS`        | `120`                    |
//! | `LOG_FORMAT`              | `pretty` (or `json`)     |

use std::str::FromStr;
use std::time::Duration;

use kublade_core::jobs::DEFAULT_WORKER_QUEUES;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} has an invalid value '{value}'")]
    Invalid { key: &'static str, value: String },

    #[error("WORKER_QUEUES must name at least one queue")]
    NoQueues,

    #[error("WORKER_CONCURRENCY must be at least 1")]
    ZeroConcurrency,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Identity reported in heartbeats; unique per process.
    pub name: String,
    /// Claimed in this order.
    pub queues: Vec<String>,
    pub concurrency: usize,
    /// Sleep between claims while every queue is empty.
    pub poll_interval: Duration,
    /// `None` when the import scheduler is off.
    pub dispatch_interval: Option<Duration>,
    pub stale_job_after: Duration,
    pub paused: bool,
    pub git_binary: String,
    pub git_timeout: Duration,
    pub log_json: bool,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let queues = match std::env::var("WORKER_QUEUES") {
            Ok(raw) => split_list(&raw),
            Err(_) => DEFAULT_WORKER_QUEUES.iter().map(|q| q.to_string()).collect(),
        };
        if queues.is_empty() {
            return Err(ConfigError::NoQueues);
        }

        let concurrency: usize = parse_or("WORKER_CONCURRENCY", 4)?;
        if concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }

        let dispatch_secs: u64 = parse_or("DISPATCH_INTERVAL_SECS", 300)?;

        Ok(Self {
            name: std::env::var("WORKER_NAME").unwrap_or_else(|_| default_name()),
            queues,
            concurrency,
            poll_interval: Duration::from_millis(parse_or("WORKER_POLL_INTERVAL_MS", 1000)?),
            dispatch_interval: (dispatch_secs > 0).then(|| Duration::from_secs(dispatch_secs)),
            stale_job_after: Duration::from_secs(parse_or("STALE_JOB_SECS", 3600)?),
            paused: std::env::var("WORKER_PAUSED").is_ok_and(|v| is_truthy(&v)),
            git_binary: std::env::var("GIT_BINARY").unwrap_or_else(|_| "git".into()),
            git_timeout: Duration::from_secs(parse_or("GIT_TIMEOUT_SECS", 120)?),
            log_json: std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")),
        })
    }
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        Err(_) => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_truthy(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn default_name() -> String {
    let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "worker".into());
    format!("{host}-{}", std::process::id())
}

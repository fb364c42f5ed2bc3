use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sepal_worker::config::{
    artifact_dir_from_env, model_path_from_env, report_format_from_env, ReportFormat,
};

/// Where the job store and queue live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// In-process store and queue; jobs are lost on restart.
    Memory,
    /// Postgres `jobs` and `job_queue` tables, shared with worker processes.
    Postgres,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Backend::Memory),
            "postgres" | "postgresql" => Ok(Backend::Postgres),
            other => Err(format!("unknown backend '{other}'")),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long to wait for embedded workers after the listener closes (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Result wait used when the caller gives no `timeout_secs` (default: `10`).
    pub result_wait_default_secs: u64,
    /// Upper bound on a caller-supplied result wait (default: `25`).
    pub result_wait_max_secs: u64,
    pub backend: Backend,
    /// Required when `backend` is Postgres.
    pub database_url: Option<String>,
    pub artifact_dir: PathBuf,
    pub model_path: Option<PathBuf>,
    pub report_format: ReportFormat,
    /// Worker loops run inside the server process.
    pub embedded_workers: usize,
    pub poll_interval_ms: u64,
    pub lease_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                    |
    /// |----------------------------|----------------------------|
    /// | `HOST`                     | `0.0.0.0`                  |
    /// | `PORT`                     | `3000`                     |
    /// | `CORS_ORIGINS`             | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`     | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`    | `30`                       |
    /// | `RESULT_WAIT_DEFAULT_SECS` | `10`                       |
    /// | `RESULT_WAIT_MAX_SECS`     | `25`                       |
    /// | `BACKEND`                  | `postgres`                 |
    /// | `DATABASE_URL`             | (required for postgres)    |
    /// | `ARTIFACT_DIR`             | `./artifacts`              |
    /// | `MODEL_PATH`               | (built-in iris model)      |
    /// | `REPORT_FORMAT`            | `pdf`                      |
    /// | `EMBEDDED_WORKERS`         | `2` memory, `0` postgres   |
    /// | `POLL_INTERVAL_MS`         | `100`                      |
    /// | `LEASE_SECS`               | `300`                      |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let result_wait_default_secs: u64 = std::env::var("RESULT_WAIT_DEFAULT_SECS")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .expect("RESULT_WAIT_DEFAULT_SECS must be a valid u64");

        let result_wait_max_secs: u64 = std::env::var("RESULT_WAIT_MAX_SECS")
            .unwrap_or_else(|_| "25".into())
            .parse()
            .expect("RESULT_WAIT_MAX_SECS must be a valid u64");

        let backend: Backend = std::env::var("BACKEND")
            .unwrap_or_else(|_| "postgres".into())
            .parse()
            .expect("BACKEND must be 'memory' or 'postgres'");

        let database_url = std::env::var("DATABASE_URL").ok();

        let default_workers = match backend {
            Backend::Memory => "2",
            Backend::Postgres => "0",
        };
        let embedded_workers: usize = std::env::var("EMBEDDED_WORKERS")
            .unwrap_or_else(|_| default_workers.into())
            .parse()
            .expect("EMBEDDED_WORKERS must be a valid usize");

        let poll_interval_ms: u64 = std::env::var("POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "100".into())
            .parse()
            .expect("POLL_INTERVAL_MS must be a valid u64");

        let lease_secs: u64 = std::env::var("LEASE_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("LEASE_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            result_wait_default_secs,
            result_wait_max_secs,
            backend,
            database_url,
            artifact_dir: artifact_dir_from_env(),
            model_path: model_path_from_env(),
            report_format: report_format_from_env(),
            embedded_workers,
            poll_interval_ms,
            lease_secs,
        }
    }

    /// How long a result request may block: the caller's value (or the
    /// default), capped at the configured maximum.
    pub fn result_wait(&self, requested_secs: Option<u64>) -> Duration {
        let secs = requested_secs
            .unwrap_or(self.result_wait_default_secs)
            .min(self.result_wait_max_secs);
        Duration::from_secs(secs)
    }
}

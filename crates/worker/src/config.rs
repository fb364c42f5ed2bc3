use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sepal_core::capability::{CapabilityError, Predictor, ReportWriter};
use sepal_pipeline::{NearestCentroidPredictor, PdfReportWriter, TextReportWriter};

/// Document format of rendered reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Pdf,
    Text,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(ReportFormat::Pdf),
            "text" | "txt" => Ok(ReportFormat::Text),
            other => Err(format!("unknown report format '{other}'")),
        }
    }
}

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Postgres connection string (required).
    pub database_url: String,
    /// Delay between queue polls when the queue is empty (default: `500` ms).
    pub poll_interval: Duration,
    /// How long a claimed job stays invisible to other workers (default: `300` s).
    pub lease: Duration,
    /// Number of concurrent worker loops in this process (default: `1`).
    pub concurrency: usize,
    /// Centroid model file. The built-in iris model is used when unset.
    pub model_path: Option<PathBuf>,
    /// Directory rendered reports are written to (default: `./artifacts`).
    pub artifact_dir: PathBuf,
    /// Report document format (default: `pdf`).
    pub report_format: ReportFormat,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var              | Default       |
    /// |----------------------|---------------|
    /// | `DATABASE_URL`       | (required)    |
    /// | `POLL_INTERVAL_MS`   | `500`         |
    /// | `LEASE_SECS`         | `300`         |
    /// | `WORKER_CONCURRENCY` | `1`           |
    /// | `MODEL_PATH`         | (built-in)    |
    /// | `ARTIFACT_DIR`       | `./artifacts` |
    /// | `REPORT_FORMAT`      | `pdf`         |
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let poll_interval_ms: u64 = std::env::var("POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "500".into())
            .parse()
            .expect("POLL_INTERVAL_MS must be a valid u64");

        let lease_secs: u64 = std::env::var("LEASE_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("LEASE_SECS must be a valid u64");

        let concurrency: usize = std::env::var("WORKER_CONCURRENCY")
            .unwrap_or_else(|_| "1".into())
            .parse()
            .expect("WORKER_CONCURRENCY must be a valid usize");

        Self {
            database_url,
            poll_interval: Duration::from_millis(poll_interval_ms),
            lease: Duration::from_secs(lease_secs),
            concurrency: concurrency.max(1),
            model_path: model_path_from_env(),
            artifact_dir: artifact_dir_from_env(),
            report_format: report_format_from_env(),
        }
    }
}

/// `MODEL_PATH`, if set and non-empty.
pub fn model_path_from_env() -> Option<PathBuf> {
    std::env::var("MODEL_PATH")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
}

/// `ARTIFACT_DIR`, defaulting to `./artifacts`.
pub fn artifact_dir_from_env() -> PathBuf {
    std::env::var("ARTIFACT_DIR")
        .unwrap_or_else(|_| "./artifacts".into())
        .into()
}

/// `REPORT_FORMAT`, defaulting to PDF.
pub fn report_format_from_env() -> ReportFormat {
    std::env::var("REPORT_FORMAT")
        .unwrap_or_else(|_| "pdf".into())
        .parse()
        .expect("REPORT_FORMAT must be 'pdf' or 'text'")
}

pub fn load_report_writer(format: ReportFormat) -> Arc<dyn ReportWriter> {
    match format {
        ReportFormat::Pdf => Arc::new(PdfReportWriter),
        ReportFormat::Text => Arc::new(TextReportWriter),
    }
}

/// Build the predictor: the model file when one is configured, otherwise
/// the built-in iris model.
pub fn load_predictor(
    model_path: Option<&std::path::Path>,
) -> Result<Arc<dyn Predictor>, CapabilityError> {
    match model_path {
        Some(path) => Ok(Arc::new(NearestCentroidPredictor::from_file(path)?)),
        None => {
            tracing::info!("No MODEL_PATH set, using built-in iris model");
            Ok(Arc::new(NearestCentroidPredictor::iris()))
        }
    }
}

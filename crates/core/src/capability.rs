//! External collaborators consumed by job execution.
//!
//! - [`Predictor`]: numeric vector in fixed field order -> label.
//! - [`ReportWriter`]: ordered `(name, value)` pairs + label -> document bytes.
//! - [`ArtifactStore`]: durable, id-keyed storage for rendered documents.
//!
//! All three are built once at startup and shared by reference across
//! every job execution; none of them is mutated per job.

use async_trait::async_trait;

use crate::types::{ArtifactRef, JobId};

/// Failure reported by a capability adapter.
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    /// The adapter rejected its input (wrong vector length, bad reference).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The adapter's backing resource is unusable (e.g. a corrupt model).
    #[error("Unavailable: {0}")]
    Unavailable(String),
}

/// Inference capability.
pub trait Predictor: Send + Sync {
    fn predict(&self, features: &[f64]) -> Result<String, CapabilityError>;
}

/// Document-generation capability.
pub trait ReportWriter: Send + Sync {
    /// Render every entry, in order, followed by the predicted label.
    fn render(&self, entries: &[(String, String)], label: &str) -> Result<Vec<u8>, CapabilityError>;

    /// File extension (without dot) of the rendered document. The served
    /// content type is derived from it via [`content_type_for`].
    fn extension(&self) -> &'static str;
}

/// Durable storage for rendered artifacts, one per job id.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Write `bytes` under a key derived from `id`. Writing the same id
    /// twice replaces the earlier artifact.
    async fn persist(
        &self,
        id: JobId,
        extension: &str,
        bytes: &[u8],
    ) -> Result<ArtifactRef, CapabilityError>;

    async fn load(&self, artifact: &ArtifactRef) -> Result<Vec<u8>, CapabilityError>;
}

/// MIME type for an artifact file extension.
pub fn content_type_for(extension: Option<&str>) -> &'static str {
    match extension {
        Some("txt") => "text/plain; charset=utf-8",
        Some("pdf") => "application/pdf",
        Some("html") => "text/html; charset=utf-8",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

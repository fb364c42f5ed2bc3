//! Job execution: the phase runner and the concrete capability adapters
//! it is wired with in production.
//!
//! - [`runner::JobRunner`]: drives one delivery through every phase.
//! - [`predictor::NearestCentroidPredictor`]: model-file predictor.
//! - [`pdf::PdfReportWriter`]: PDF report writer (the production default).
//! - [`report::TextReportWriter`]: plain-text report writer.
//! - [`artifact::LocalArtifactStore`]: artifacts on the local filesystem.

pub mod artifact;
pub mod pdf;
pub mod predictor;
pub mod report;
pub mod runner;

pub use artifact::LocalArtifactStore;
pub use pdf::PdfReportWriter;
pub use predictor::NearestCentroidPredictor;
pub use report::TextReportWriter;
pub use runner::JobRunner;

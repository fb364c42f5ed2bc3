use std::sync::Arc;

use sepal_core::handle::JobHandle;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Submission, polling and retrieval over the configured backend.
    pub jobs: JobHandle,
    /// Server configuration (result wait bounds).
    pub config: Arc<ServerConfig>,
}

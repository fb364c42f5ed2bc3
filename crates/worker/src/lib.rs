//! Sepal worker library.
//!
//! The polling loop that pulls deliveries off a [`JobQueue`] and hands them
//! to a [`JobRunner`], plus the configuration and wiring shared by the
//! standalone worker binary and the API server's embedded workers.
//!
//! [`JobQueue`]: sepal_core::backend::JobQueue
//! [`JobRunner`]: sepal_pipeline::JobRunner

pub mod config;
pub mod signal;
pub mod worker;

pub use worker::{spawn_workers, Worker};

//! Domain core of the prediction-report job service.
//!
//! Pure types and the seams everything else plugs into:
//!
//! - [`job`]: the job snapshot and its phase state machine.
//! - [`validation`]: required-field checks and numeric conversion.
//! - [`backend`]: [`JobStore`](backend::JobStore) and
//!   [`JobQueue`](backend::JobQueue) traits.
//! - [`capability`]: predictor, report writer and artifact store traits.
//! - [`handle`]: submission, progress polling and result retrieval.
//! - [`memory`]: in-process backends.

pub mod backend;
pub mod capability;
pub mod error;
pub mod handle;
pub mod job;
pub mod memory;
pub mod record;
pub mod status;
pub mod types;
pub mod validation;

//! Database row types and their conversions into core domain types.

pub mod job;
pub mod status;

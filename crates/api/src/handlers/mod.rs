pub mod jobs;
pub mod predictions;

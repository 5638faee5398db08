//! Custom Axum extractors.

pub mod caller;
pub mod path;

pub use caller::Caller;
pub use path::parse_job_id;

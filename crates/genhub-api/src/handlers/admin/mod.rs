//! Read-only diagnostics and manual cleanup.

pub mod jobs;

//! Core type definitions used across the GenHub workspace.

pub mod id;

pub use id::*;

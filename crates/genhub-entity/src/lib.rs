//! # genhub-entity
//!
//! Domain entity models for GenHub. The only entity is the [`job::Job`]
//! record tracked by the in-memory job store, along with its lifecycle
//! status and the typed payloads of the built-in image transformations.

pub mod job;

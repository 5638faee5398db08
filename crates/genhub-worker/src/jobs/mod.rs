//! Built-in image processors and the upstream client they share.

pub mod fusion;
pub mod generation;
pub mod upstream;

#[cfg(test)]
pub(crate) mod testing;

pub use fusion::FusionProcessor;
pub use generation::GenerationProcessor;
pub use upstream::{HttpUpstreamClient, UpstreamClient, UpstreamError};

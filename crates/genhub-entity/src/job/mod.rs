//! Orchestrated job entities.

pub mod model;
pub mod payload;
pub mod status;

pub use model::{Job, JobPatch, JobView, TransitionError};
pub use payload::{
    FusionRequest, FusionResult, GeneratedImage, GenerationRequest, GenerationResult, IMAGE_FUSION,
    IMAGE_GENERATION, JobPayload,
};
pub use status::JobStatus;

//! Request DTOs.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

/// Job submission body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitJobRequest {
    /// Processor key, e.g. `"image_generation"`.
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 64, message = "Job type must be 1-64 characters"))]
    pub job_type: String,
    /// Type-specific input.
    #[serde(default)]
    pub payload: Value,
}

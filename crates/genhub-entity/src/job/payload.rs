//! Typed payload and result definitions for the built-in job types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationErrors};

/// Job type key for text-to-image generation.
pub const IMAGE_GENERATION: &str = "image_generation";
/// Job type key for multi-image fusion.
pub const IMAGE_FUSION: &str = "image_fusion";

/// Typed payloads for known job types, tagged by job type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum JobPayload {
    /// Generate images from a text prompt.
    #[serde(rename = "image_generation")]
    ImageGeneration(GenerationRequest),
    /// Fuse several source images into one.
    #[serde(rename = "image_fusion")]
    ImageFusion(FusionRequest),
}

impl JobPayload {
    /// The processor key for this payload.
    pub fn job_type(&self) -> &'static str {
        match self {
            Self::ImageGeneration(_) => IMAGE_GENERATION,
            Self::ImageFusion(_) => IMAGE_FUSION,
        }
    }

    /// Validate the inner request.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            Self::ImageGeneration(req) => req.validate(),
            Self::ImageFusion(req) => req.validate(),
        }
    }

    /// Split into the processor key and the untagged JSON payload.
    pub fn into_parts(self) -> Result<(&'static str, Value), serde_json::Error> {
        let job_type = self.job_type();
        let value = match self {
            Self::ImageGeneration(req) => serde_json::to_value(req)?,
            Self::ImageFusion(req) => serde_json::to_value(req)?,
        };
        Ok((job_type, value))
    }
}

/// Input for an `image_generation` job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct GenerationRequest {
    /// Text prompt.
    #[validate(length(min = 1, max = 4000, message = "Prompt must be 1-4000 characters"))]
    pub prompt: String,
    /// Optional style preset forwarded to the upstream service.
    #[serde(default)]
    pub style: Option<String>,
    /// Output width in pixels.
    #[serde(default = "default_dimension")]
    #[validate(range(min = 64, max = 2048))]
    pub width: u32,
    /// Output height in pixels.
    #[serde(default = "default_dimension")]
    #[validate(range(min = 64, max = 2048))]
    pub height: u32,
    /// Number of images to produce.
    #[serde(default = "default_count")]
    #[validate(range(min = 1, max = 4))]
    pub count: u32,
}

/// A single produced image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImage {
    /// URL or data URI of the image.
    pub url: String,
    /// Seed reported by the upstream service, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Output of an `image_generation` job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Produced images, in request order.
    pub images: Vec<GeneratedImage>,
    /// Model that produced them.
    pub model: String,
}

/// Input for an `image_fusion` job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct FusionRequest {
    /// Source images as URLs or base64 data URIs.
    #[validate(length(min = 2, max = 6, message = "Fusion needs between 2 and 6 images"))]
    pub images: Vec<String>,
    /// Optional guidance for the fused result.
    #[serde(default)]
    #[validate(length(max = 4000))]
    pub prompt: Option<String>,
    /// How strongly the sources are blended, 0.0-1.0.
    #[serde(default = "default_strength")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub strength: f32,
}

/// Output of an `image_fusion` job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionResult {
    /// The fused image.
    pub image: GeneratedImage,
    /// Upstream description of the sources used to steer the fusion.
    pub description: String,
}

fn default_dimension() -> u32 {
    1024
}

fn default_count() -> u32 {
    1
}

fn default_strength() -> f32 {
    0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tagged_generation_payload() {
        let payload: JobPayload = serde_json::from_value(json!({
            "type": "image_generation",
            "payload": { "prompt": "a lighthouse at dusk" }
        }))
        .expect("deserialize");

        assert_eq!(payload.job_type(), IMAGE_GENERATION);
        assert!(payload.validate().is_ok());

        let (job_type, value) = payload.into_parts().expect("parts");
        assert_eq!(job_type, "image_generation");
        assert_eq!(value["width"], 1024);
        assert_eq!(value["count"], 1);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let parsed = serde_json::from_value::<JobPayload>(json!({
            "type": "video_generation",
            "payload": {}
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_fusion_requires_two_images() {
        let payload = JobPayload::ImageFusion(FusionRequest {
            images: vec!["https://img/1.png".to_string()],
            prompt: None,
            strength: 0.5,
        });
        let errors = payload.validate().expect_err("one image is not enough");
        assert!(errors.field_errors().contains_key("images"));
    }
}

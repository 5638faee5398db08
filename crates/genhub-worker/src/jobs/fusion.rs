//! Multi-image fusion processor.
//!
//! Two upstream steps: the sources are described first, and the description
//! (plus any caller prompt) steers the fusion call.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use validator::Validate;

use genhub_entity::job::{FusionRequest, FusionResult};

use super::upstream::{FuseParams, UpstreamClient};
use crate::executor::{JobContext, Processor, ProcessorError};
use crate::retry::{RetryPolicy, with_retry};

/// Fuses two or more source images into one.
pub struct FusionProcessor {
    client: Arc<dyn UpstreamClient>,
    retry: RetryPolicy,
}

impl FusionProcessor {
    /// Create a processor calling `client`, retrying each step per `retry`.
    pub fn new(client: Arc<dyn UpstreamClient>, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }
}

/// Check that `source` is an http(s) URL or a base64 image data URI.
fn check_source(index: usize, source: &str) -> Result<(), ProcessorError> {
    if source.starts_with("https://") || source.starts_with("http://") {
        return Ok(());
    }

    let invalid = |why: &str| ProcessorError::InvalidPayload(format!("images[{index}]: {why}"));

    let Some(rest) = source.strip_prefix("data:") else {
        return Err(invalid("expected a URL or a data URI"));
    };
    let Some((media, data)) = rest.split_once(',') else {
        return Err(invalid("malformed data URI"));
    };
    let Some(mime) = media.strip_suffix(";base64") else {
        return Err(invalid("data URI must be base64 encoded"));
    };
    if !mime.starts_with("image/") {
        return Err(invalid("data URI is not an image"));
    }
    BASE64
        .decode(data)
        .map_err(|_| invalid("invalid base64 encoding"))?;
    Ok(())
}

fn fusion_prompt(description: &str, prompt: Option<&str>) -> String {
    match prompt.map(str::trim).filter(|p| !p.is_empty()) {
        Some(prompt) => format!("{prompt}. Sources: {description}"),
        None => format!("Blend these sources into one coherent image. Sources: {description}"),
    }
}

#[async_trait]
impl Processor for FusionProcessor {
    type Payload = FusionRequest;
    type Output = FusionResult;

    fn validate(&self, payload: &FusionRequest) -> Result<(), ProcessorError> {
        payload
            .validate()
            .map_err(|e| ProcessorError::InvalidPayload(e.to_string()))?;
        for (index, source) in payload.images.iter().enumerate() {
            check_source(index, source)?;
        }
        Ok(())
    }

    async fn process(
        &self,
        ctx: &JobContext,
        payload: FusionRequest,
    ) -> Result<FusionResult, ProcessorError> {
        ctx.report_progress(10).await;

        let description = with_retry(self.retry, "image_fusion.describe", || {
            self.client.describe(&payload.images)
        })
        .await
        .map_err(|e| ProcessorError::Upstream(e.to_string()))?;
        ctx.report_progress(50).await;

        let prompt = fusion_prompt(&description, payload.prompt.as_deref());
        let params = FuseParams {
            model: self.client.model(),
            images: &payload.images,
            prompt: &prompt,
            strength: payload.strength,
        };
        let image = with_retry(self.retry, "image_fusion.fuse", || {
            self.client.fuse(params.clone())
        })
        .await
        .map_err(|e| ProcessorError::Upstream(e.to_string()))?;
        ctx.report_progress(90).await;

        tracing::debug!(job_id = %ctx.job_id(), sources = payload.images.len(), "Images fused");
        Ok(FusionResult { image, description })
    }
}

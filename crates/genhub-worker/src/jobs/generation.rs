//! Text-to-image generation processor.

use std::sync::Arc;

use async_trait::async_trait;
use validator::Validate;

use genhub_entity::job::{GenerationRequest, GenerationResult};

use super::upstream::{GenerateParams, UpstreamClient};
use crate::executor::{JobContext, Processor, ProcessorError};
use crate::retry::{RetryPolicy, with_retry};

/// Produces `count` images for a prompt, one upstream call per image.
pub struct GenerationProcessor {
    client: Arc<dyn UpstreamClient>,
    retry: RetryPolicy,
}

impl GenerationProcessor {
    /// Create a processor calling `client`, retrying each image per `retry`.
    pub fn new(client: Arc<dyn UpstreamClient>, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }
}

#[async_trait]
impl Processor for GenerationProcessor {
    type Payload = GenerationRequest;
    type Output = GenerationResult;

    fn validate(&self, payload: &GenerationRequest) -> Result<(), ProcessorError> {
        payload
            .validate()
            .map_err(|e| ProcessorError::InvalidPayload(e.to_string()))
    }

    async fn process(
        &self,
        ctx: &JobContext,
        payload: GenerationRequest,
    ) -> Result<GenerationResult, ProcessorError> {
        let count = payload.count.max(1);
        let mut images = Vec::with_capacity(count as usize);
        ctx.report_progress(5).await;

        for index in 0..count {
            let params = GenerateParams {
                model: self.client.model(),
                prompt: &payload.prompt,
                style: payload.style.as_deref(),
                width: payload.width,
                height: payload.height,
            };
            let image = with_retry(self.retry, "image_generation", || {
                self.client.generate(params.clone())
            })
            .await
            .map_err(|e| ProcessorError::Upstream(e.to_string()))?;

            tracing::debug!(job_id = %ctx.job_id(), index, "Image generated");
            images.push(image);

            let done = ((index + 1) * 90 / count) as u8;
            ctx.report_progress(5 + done).await;
        }

        Ok(GenerationResult {
            images,
            model: self.client.model().to_string(),
        })
    }
}

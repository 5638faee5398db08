//! In-process upstream double for processor tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use genhub_entity::job::GeneratedImage;

use super::upstream::{FuseParams, GenerateParams, UpstreamClient, UpstreamError};

/// Upstream that answers deterministically, optionally failing the first calls.
#[derive(Debug, Default)]
pub struct FakeUpstream {
    failures_left: AtomicUsize,
    generate_calls: AtomicUsize,
    describe_calls: AtomicUsize,
    fuse_calls: AtomicUsize,
}

impl FakeUpstream {
    /// Fail the first `n` calls with a 503.
    pub fn failing_first(n: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(n),
            ..Default::default()
        }
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }

    pub fn fuse_calls(&self) -> usize {
        self.fuse_calls.load(Ordering::SeqCst)
    }

    fn maybe_fail(&self) -> Result<(), UpstreamError> {
        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(UpstreamError::Status {
                status: 503,
                body: "upstream unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl UpstreamClient for FakeUpstream {
    fn model(&self) -> &str {
        "fake-model"
    }

    async fn generate(&self, _params: GenerateParams<'_>) -> Result<GeneratedImage, UpstreamError> {
        let n = self.generate_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.maybe_fail()?;
        Ok(GeneratedImage {
            url: format!("https://fake/generated/{n}.png"),
            seed: Some(n as u64),
        })
    }

    async fn describe(&self, images: &[String]) -> Result<String, UpstreamError> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_fail()?;
        Ok(format!("{} images of a coastline", images.len()))
    }

    async fn fuse(&self, params: FuseParams<'_>) -> Result<GeneratedImage, UpstreamError> {
        self.fuse_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_fail()?;
        Ok(GeneratedImage {
            url: format!("https://fake/fused/{}.png", params.images.len()),
            seed: None,
        })
    }
}

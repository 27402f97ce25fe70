//! Video provider trait.

use crate::error::Result;
use crate::video::types::{GeneratedVideo, VideoGenerationRequest};
use async_trait::async_trait;

/// Trait for video generation providers.
#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// Animates the request's source image into a clip.
    ///
    /// Runs until the job finishes, fails, or exhausts its poll budget.
    /// Dropping the future abandons the job.
    async fn generate(&self, request: &VideoGenerationRequest) -> Result<GeneratedVideo>;

    /// Returns the name of this provider for display.
    fn name(&self) -> &str;

    /// Checks if the provider is reachable and authenticated.
    async fn health_check(&self) -> Result<()>;
}

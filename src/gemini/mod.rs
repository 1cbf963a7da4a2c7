pub mod image_client;
pub mod prompt;

use crate::{
    config::GeminiConfig,
    credentials::CredentialResolver,
    error::Result,
    models::{GeneratedImage, ShotGenerationRequest},
};
use async_trait::async_trait;

pub use image_client::{classify_failure, is_quota_message, ImageClient};

/// Anything that can turn a shot request into an image.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    async fn generate(&self, request: ShotGenerationRequest) -> Result<GeneratedImage>;
}

#[derive(Clone)]
pub struct GeminiClient {
    image_client: ImageClient,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig, credentials: CredentialResolver) -> Result<Self> {
        Ok(Self {
            image_client: ImageClient::new(config, credentials)?,
        })
    }

    pub fn image(&self) -> &ImageClient {
        &self.image_client
    }
}

#[async_trait]
impl ImageBackend for GeminiClient {
    async fn generate(&self, request: ShotGenerationRequest) -> Result<GeneratedImage> {
        self.image_client.generate(request).await
    }
}

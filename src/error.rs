use crate::models::AssetRole;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StudioError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("API Key not found. Please set your API Key in Settings.")]
    MissingCredential,

    #[error("Maximum {max} {role} allowed.")]
    UploadLimitExceeded { role: AssetRole, max: usize },

    #[error("Unsupported media: {0}")]
    UnsupportedMedia(String),

    #[error("Asset not found: {0}")]
    AssetNotFound(Uuid),

    #[error("Shot not found: {0}")]
    ShotNotFound(Uuid),

    #[error("Invalid shot index {index} (board has {len} shots)")]
    InvalidIndex { index: usize, len: usize },

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("{0}")]
    GenerationFailed(String),

    #[error("No image generated in response.")]
    NoImageReturned,

    #[error("Shot {0} has no generated image to upscale")]
    NothingToUpscale(Uuid),

    #[error("Request error: {0}")]
    RequestError(String),

    #[error("Response error: {0}")]
    ResponseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl StudioError {
    /// Rate-limit and quota rejections are routed to the key-replacement flow.
    pub fn is_quota(&self) -> bool {
        matches!(self, StudioError::QuotaExceeded(_))
    }
}

impl From<serde_json::Error> for StudioError {
    fn from(e: serde_json::Error) -> Self {
        StudioError::SerializationError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StudioError>;

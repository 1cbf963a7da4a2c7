//! Storyboard studio for AI fashion photography.
//!
//! Reference images (garments, models, poses) live in an [`AssetStore`],
//! frames in a [`ShotStore`], both owned by a [`Board`]. A [`Studio`] renders
//! shots through an [`ImageBackend`], normally the Gemini [`ImageClient`].

pub mod config;
pub mod credentials;
pub mod error;
pub mod gemini;
pub mod logger;
pub mod models;
pub mod store;
pub mod studio;

pub use config::{BoardLimits, GeminiConfig, StudioConfig};
pub use credentials::{
    mask_key, CredentialResolution, CredentialResolver, CredentialSource, CredentialStore,
    FileCredentialStore, HostKeySelector, MemoryCredentialStore,
};
pub use error::{Result, StudioError};
pub use gemini::{GeminiClient, ImageBackend, ImageClient};
pub use models::*;
pub use store::{AssetStore, Board, BoardAction, BoardEvent, ShotStore, StoryCursor};
pub use studio::{GenerationOutcome, QuotaObserver, Studio};

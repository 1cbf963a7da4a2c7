use crate::error::Result;
use async_trait::async_trait;

/// Fixed name the persisted key is stored under.
pub const CREDENTIAL_KEY_NAME: &str = "gemini_api_key";

/// Persistent home of a user-supplied API key.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, key: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Key picker offered by an embedding host, consulted last.
#[async_trait]
pub trait HostKeySelector: Send + Sync {
    async fn has_selected_key(&self) -> Result<bool>;
    async fn selected_key(&self) -> Result<Option<String>>;
}

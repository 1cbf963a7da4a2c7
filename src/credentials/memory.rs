use super::traits::CredentialStore;
use crate::error::Result;
use std::sync::RwLock;

#[derive(Default)]
pub struct MemoryCredentialStore {
    key: RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: RwLock::new(Some(key.into())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.key.read().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, key: &str) -> Result<()> {
        *self.key.write().unwrap_or_else(|e| e.into_inner()) = Some(key.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.key.write().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

use super::traits::{CredentialStore, HostKeySelector};
use crate::error::{Result, StudioError};
use std::fmt;
use std::sync::Arc;

/// Environment variables checked, in order, after the persisted key.
pub const ENV_KEY_VARS: [&str; 2] = ["API_KEY", "GEMINI_API_KEY"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Persisted,
    Environment,
    Host,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Persisted => write!(f, "saved key"),
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::Host => write!(f, "host key selector"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialResolution {
    Found {
        key: String,
        source: CredentialSource,
    },
    NotFound,
}

impl CredentialResolution {
    pub fn key(&self) -> Option<&str> {
        match self {
            CredentialResolution::Found { key, .. } => Some(key),
            CredentialResolution::NotFound => None,
        }
    }

    pub fn into_key(self) -> Result<String> {
        match self {
            CredentialResolution::Found { key, .. } => Ok(key),
            CredentialResolution::NotFound => Err(StudioError::MissingCredential),
        }
    }
}

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Ordered key lookup: persisted store, then environment, then host selector.
#[derive(Clone)]
pub struct CredentialResolver {
    store: Arc<dyn CredentialStore>,
    env: EnvLookup,
    host: Option<Arc<dyn HostKeySelector>>,
}

impl CredentialResolver {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            env: Arc::new(|name| std::env::var(name).ok()),
            host: None,
        }
    }

    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Arc::new(lookup);
        self
    }

    pub fn with_host(mut self, host: Arc<dyn HostKeySelector>) -> Self {
        self.host = Some(host);
        self
    }

    pub async fn resolve(&self) -> Result<CredentialResolution> {
        if let Some(key) = non_empty(self.store.load()?) {
            return Ok(found(key, CredentialSource::Persisted));
        }

        if let Some(key) = ENV_KEY_VARS.iter().find_map(|name| non_empty((self.env)(*name))) {
            return Ok(found(key, CredentialSource::Environment));
        }

        if let Some(host) = &self.host {
            match host.has_selected_key().await {
                Ok(true) => {
                    if let Some(key) = non_empty(host.selected_key().await?) {
                        return Ok(found(key, CredentialSource::Host));
                    }
                }
                Ok(false) => {}
                Err(e) => log::error!("Error checking host key selector: {}", e),
            }
        }

        Ok(CredentialResolution::NotFound)
    }

    /// Saves a key typed by the user; surrounding whitespace is dropped.
    pub fn submit_key(&self, raw: &str) -> Result<String> {
        let key = raw.trim();
        if key.is_empty() {
            return Err(StudioError::ConfigError("API key must not be empty".into()));
        }
        self.store.save(key)?;
        log::info!("API key saved ({})", mask_key(key));
        Ok(key.to_string())
    }

    /// The persisted key, used to pre-fill the settings form.
    pub fn persisted_key(&self) -> Result<Option<String>> {
        self.store.load()
    }

    pub fn reset(&self) -> Result<()> {
        self.store.clear()?;
        log::info!("Saved API key removed");
        Ok(())
    }
}

fn found(key: String, source: CredentialSource) -> CredentialResolution {
    CredentialResolution::Found { key, source }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Display form of a key: first six and last four characters.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.is_empty() {
        return "No Key".to_string();
    }
    if chars.len() < 8 {
        return "********".to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

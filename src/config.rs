use crate::models::AssetRole;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-3-pro-image-preview";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardLimits {
    pub max_garments: usize,
    pub max_poses: usize,
    pub max_models: usize,
}

impl Default for BoardLimits {
    fn default() -> Self {
        BoardLimits {
            max_garments: 12,
            max_poses: 8,
            max_models: 4,
        }
    }
}

impl BoardLimits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let read = |key: &str, fallback: usize| {
            env::var(key)
                .ok()
                .and_then(|val| val.parse().ok())
                .unwrap_or(fallback)
        };

        BoardLimits {
            max_garments: read("SHOTBOARD_MAX_GARMENTS", defaults.max_garments),
            max_poses: read("SHOTBOARD_MAX_POSES", defaults.max_poses),
            max_models: read("SHOTBOARD_MAX_MODELS", defaults.max_models),
        }
    }

    pub fn max_for(&self, role: AssetRole) -> usize {
        match role {
            AssetRole::Garment => self.max_garments,
            AssetRole::Pose => self.max_poses,
            AssetRole::Model => self.max_models,
        }
    }

    pub fn with_max(mut self, role: AssetRole, max: usize) -> Self {
        match role {
            AssetRole::Garment => self.max_garments = max,
            AssetRole::Pose => self.max_poses = max,
            AssetRole::Model => self.max_models = max,
        }
        self
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_base: Option<String>,
    pub model: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            api_base: None,
            model: None,
            request_timeout_secs: None,
        }
    }
}

impl GeminiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let api_base = env::var("SHOTBOARD_API_BASE").ok();
        let model = env::var("SHOTBOARD_MODEL").ok();
        let request_timeout_secs = env::var("SHOTBOARD_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok());

        GeminiConfig {
            api_base,
            model,
            request_timeout_secs,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = Some(secs);
        self
    }

    pub fn api_base(&self) -> &str {
        self.api_base
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_IMAGE_MODEL)
    }
}

#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub board_path: Option<PathBuf>,
    pub credentials_path: Option<PathBuf>,
    pub gemini: GeminiConfig,
    pub limits: BoardLimits,
}

impl Default for StudioConfig {
    fn default() -> Self {
        StudioConfig {
            board_path: None,
            credentials_path: None,
            gemini: GeminiConfig::default(),
            limits: BoardLimits::default(),
        }
    }
}

impl StudioConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let board_path = env::var("SHOTBOARD_BOARD_PATH").ok().map(PathBuf::from);
        let credentials_path = env::var("SHOTBOARD_CREDENTIALS_PATH")
            .ok()
            .map(PathBuf::from);

        StudioConfig {
            board_path,
            credentials_path,
            gemini: GeminiConfig::from_env(),
            limits: BoardLimits::from_env(),
        }
    }

    pub fn with_board_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.board_path = Some(path.into());
        self
    }

    pub fn with_credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = Some(path.into());
        self
    }

    pub fn with_gemini(mut self, config: GeminiConfig) -> Self {
        self.gemini = config;
        self
    }

    pub fn with_limits(mut self, limits: BoardLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Board file, defaulting to `shotboard.json` in the working directory.
    pub fn board_path(&self) -> PathBuf {
        self.board_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("shotboard.json"))
    }

    /// Credential file, defaulting to the user config directory.
    pub fn credentials_path(&self) -> PathBuf {
        self.credentials_path.clone().unwrap_or_else(|| {
            let mut path = dirs::config_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from("."));
            path.push("shotboard");
            path.push("credentials.json");
            path
        })
    }
}

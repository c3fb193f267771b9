use crate::RemoteError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_MODRINTH_URL: &str = "https://api.modrinth.com";
pub const DEFAULT_CURSEFORGE_URL: &str = "https://api.curse.tools";
pub const DEFAULT_CURSEFORGE_BASE_PATH: &str = "/cf/v1";
pub const CURSEFORGE_API_KEY_ENV: &str = "SCULK_CURSEFORGE_API_KEY";

/// Endpoints and credentials for the remote APIs.
///
/// Every field is optional in the TOML file; missing ones take the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub modrinth_url: String,
    pub curseforge_url: String,
    pub curseforge_base_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curseforge_api_key: Option<String>,
    pub user_agent: String,
    pub max_attempts: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            modrinth_url: DEFAULT_MODRINTH_URL.to_owned(),
            curseforge_url: DEFAULT_CURSEFORGE_URL.to_owned(),
            curseforge_base_path: DEFAULT_CURSEFORGE_BASE_PATH.to_owned(),
            curseforge_api_key: None,
            user_agent: format!("sculk-cli/sculk/{}", env!("CARGO_PKG_VERSION")),
            max_attempts: 3,
        }
    }
}

impl ApiConfig {
    /// Load `~/.config/sculk/config.toml`, falling back to defaults when the
    /// file does not exist, then apply environment overrides.
    pub fn load_default() -> Result<Self, RemoteError> {
        let path = default_config_path()?;
        let config = if path.is_file() {
            Self::load(&path)?
        } else {
            Self::default()
        };
        Ok(config.with_env_overrides(std::env::var(CURSEFORGE_API_KEY_ENV).ok()))
    }

    pub fn load(path: &Path) -> Result<Self, RemoteError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)
            .map_err(|e| RemoteError::Config(format!("invalid API config: {e}")))?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), RemoteError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| RemoteError::Serialization(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    #[must_use]
    pub fn with_env_overrides(mut self, curseforge_api_key: Option<String>) -> Self {
        if let Some(key) = curseforge_api_key.filter(|k| !k.trim().is_empty()) {
            self.curseforge_api_key = Some(key);
        }
        self
    }

    fn normalize(&mut self) {
        self.modrinth_url = self.modrinth_url.trim_end_matches('/').to_owned();
        self.curseforge_url = self.curseforge_url.trim_end_matches('/').to_owned();
        self.max_attempts = self.max_attempts.max(1);
    }
}

fn default_config_path() -> Result<PathBuf, RemoteError> {
    let home = std::env::var("HOME").map_err(|_| RemoteError::Config("HOME not set".to_owned()))?;
    Ok(PathBuf::from(home).join(".config/sculk/config.toml"))
}

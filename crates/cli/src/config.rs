//! Configuration for the drivefs CLI
//!
//! Reads config from ~/.config/drivefs/config.toml

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use drivefs_vfs::auth::{DEFAULT_TOKEN_URL, DRIVE_SCOPE};
use drivefs_vfs::{HttpDriveConfig, OAuthClient, TokenCache};
use serde::Deserialize;

/// Remote store settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub api_base: String,
    pub upload_base: String,
    pub timeout_secs: u64,
    /// Mime type for uploads whose extension is unknown
    pub default_mime: String,
}

impl Default for DriveConfig {
    fn default() -> Self {
        let http = HttpDriveConfig::default();
        Self {
            api_base: http.api_base,
            upload_base: http.upload_base,
            timeout_secs: http.timeout.as_secs(),
            default_mime: drivefs_vfs::virtual_fs::DEFAULT_TEXT_MIME.to_string(),
        }
    }
}

/// OAuth2 settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    /// Token cache location; the config directory when unset
    pub token_path: Option<PathBuf>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_url: DEFAULT_TOKEN_URL.to_string(),
            client_id: String::new(),
            client_secret: None,
            token_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Full application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub drive: DriveConfig,
    pub auth: AuthConfig,
    pub log: LogConfig,
}

impl Config {
    /// Load from `path`, or from the default path when `None`.
    ///
    /// A missing file gives the defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map_or_else(Self::default_config_path, Path::to_path_buf);
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from_path(&path)
    }

    /// Get default config path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("drivefs")
            .join("config.toml")
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid config: {}", path.display()))
    }

    /// Create default config file if it doesn't exist
    pub fn create_default_if_missing() {
        let path = Self::default_config_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Err(e) = std::fs::write(&path, DEFAULT_CONFIG) {
                tracing::warn!(path = %path.display(), error = %e, "Could not write default config");
            }
        }
    }

    pub fn http(&self) -> HttpDriveConfig {
        HttpDriveConfig {
            api_base: self.drive.api_base.clone(),
            upload_base: self.drive.upload_base.clone(),
            timeout: Duration::from_secs(self.drive.timeout_secs),
        }
    }

    pub fn oauth(&self) -> OAuthClient {
        OAuthClient {
            token_url: self.auth.token_url.clone(),
            client_id: self.auth.client_id.clone(),
            client_secret: self.auth.client_secret.clone(),
        }
    }

    pub fn token_cache(&self) -> TokenCache {
        TokenCache::new(
            self.auth
                .token_path
                .clone()
                .unwrap_or_else(TokenCache::default_path),
        )
    }

    /// Scope the configured client must be granted
    pub const fn scope() -> &'static str {
        DRIVE_SCOPE
    }
}

const DEFAULT_CONFIG: &str = r#"# drivefs Configuration

[drive]
api_base = "https://www.googleapis.com/drive/v2"
upload_base = "https://www.googleapis.com/upload/drive/v2"
timeout_secs = 30
default_mime = "text/plain"

[auth]
token_url = "https://oauth2.googleapis.com/token"
# client_id = ""
# client_secret = ""
# token_path = "~/.config/drivefs/token.json"

[log]
level = "warn"
"#;

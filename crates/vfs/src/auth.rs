//! Access token handling for the HTTP drive client
//!
//! Tokens are cached as JSON under the user's config directory and reused
//! across runs. Expired tokens are renewed with the OAuth2 refresh-token
//! grant; the interactive consent flow is not handled here.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{FsError, Result};

/// Scope requested for full drive access
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Default OAuth2 token endpoint
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Tokens closer than this to expiry are refreshed
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Source of bearer tokens for remote calls
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// Fixed token, never refreshed
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Token record as persisted in the cache file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredToken {
    /// Usable without a refresh at `now`
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty()
            && self
                .expires_at
                .map_or(true, |at| at - Duration::seconds(EXPIRY_MARGIN_SECS) > now)
    }
}

/// JSON token cache file
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.config/drivefs/token.json` (platform config dir)
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("drivefs")
            .join("token.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cached token. A missing or unreadable cache is `None`.
    pub fn load(&self) -> Result<Option<StoredToken>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&content) {
            Ok(token) => Ok(Some(token)),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring invalid token cache");
                Ok(None)
            }
        }
    }

    pub fn save(&self, token: &StoredToken) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(token)
            .map_err(|e| FsError::Auth(format!("Failed to encode token: {e}")))?;
        std::fs::write(&self.path, json)?;
        tracing::debug!(path = %self.path.display(), "Stored credentials");
        Ok(())
    }
}

/// OAuth2 client registration
#[derive(Debug, Clone)]
pub struct OAuthClient {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: Option<String>,
}

/// Token response from the OAuth2 provider
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Cached, self-refreshing token source
pub struct Authenticator {
    cache: TokenCache,
    oauth: OAuthClient,
    http: reqwest::Client,
    current: RwLock<Option<StoredToken>>,
}

impl Authenticator {
    pub fn new(cache: TokenCache, oauth: OAuthClient) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| FsError::Auth(format!("Failed to create HTTP client: {e}")))?;
        let current = cache.load()?;
        Ok(Self {
            cache,
            oauth,
            http,
            current: RwLock::new(current),
        })
    }

    /// Exchange a refresh token and persist the result
    pub async fn login(&self, refresh_token: &str) -> Result<StoredToken> {
        let token = self.refresh(refresh_token).await?;
        self.cache.save(&token)?;
        *self.current.write().await = Some(token.clone());
        Ok(token)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<StoredToken> {
        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.oauth.client_id.as_str()),
        ];
        if let Some(secret) = &self.oauth.client_secret {
            params.push(("client_secret", secret.as_str()));
        }

        let response = self
            .http
            .post(&self.oauth.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| FsError::Auth(format!("Token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FsError::Auth(format!("Token refresh failed: {status} {body}")));
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| FsError::Auth(format!("Invalid token response: {e}")))?;

        tracing::info!("Refreshed access token");
        Ok(merge_refresh(tokens, refresh_token, Utc::now()))
    }
}

/// The provider may omit the refresh token on renewal; keep the old one.
fn merge_refresh(tokens: TokenResponse, refresh_token: &str, now: DateTime<Utc>) -> StoredToken {
    StoredToken {
        access_token: tokens.access_token,
        refresh_token: tokens
            .refresh_token
            .or_else(|| Some(refresh_token.to_string())),
        expires_at: tokens.expires_in.map(|secs| now + Duration::seconds(secs)),
    }
}

#[async_trait]
impl TokenSource for Authenticator {
    async fn access_token(&self) -> Result<String> {
        let now = Utc::now();
        let cached = self.current.read().await.clone();
        match cached {
            Some(token) if token.is_fresh(now) => Ok(token.access_token),
            Some(StoredToken {
                refresh_token: Some(refresh_token),
                ..
            }) => {
                let token = self.refresh(&refresh_token).await?;
                self.cache.save(&token)?;
                let access = token.access_token.clone();
                *self.current.write().await = Some(token);
                Ok(access)
            }
            _ => Err(FsError::Auth(format!(
                "No usable credentials in {}; run `drivefs login` first",
                self.cache.path().display()
            ))),
        }
    }
}

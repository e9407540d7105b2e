use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{
    config, spotify,
    sync::{CredentialProvider, SyncError},
    types::Token,
};

// refresh this long before the token actually expires
const EXPIRY_MARGIN_SECS: u64 = 240;

/// File-cached Spotify token that refreshes itself.
///
/// Acts as the [`CredentialProvider`] for the playback synchronizer.
pub struct TokenManager {
    token: Mutex<Token>,
    path: PathBuf,
    token_url: String,
    client_id: Option<String>,
}

impl TokenManager {
    pub fn new(token: Token) -> Self {
        TokenManager {
            token: Mutex::new(token),
            path: Self::token_path(),
            token_url: config::spotify_apitoken_url(),
            client_id: config::spotify_client_id().ok(),
        }
    }

    /// Stores the token somewhere other than the default cache file.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Refreshes against `token_url` with `client_id` instead of the
    /// configured values.
    pub fn with_endpoint(mut self, token_url: impl Into<String>, client_id: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self.client_id = Some(client_id.into());
        self
    }

    pub async fn load() -> Result<Self, String> {
        Self::load_from(&Self::token_path()).await
    }

    pub async fn load_from(path: &Path) -> Result<Self, String> {
        let content = async_fs::read_to_string(path)
            .await
            .map_err(|e| e.to_string())?;
        let token: Token = serde_json::from_str(&content).map_err(|e| e.to_string())?;
        Ok(Self::new(token).with_path(path))
    }

    /// Reads a token JSON produced elsewhere and stores it in the cache.
    pub async fn import(source: &Path) -> Result<Self, String> {
        let content = async_fs::read_to_string(source)
            .await
            .map_err(|e| e.to_string())?;
        let token: Token = serde_json::from_str(&content).map_err(|e| e.to_string())?;
        if token.access_token.is_empty() {
            return Err("token file carries no access_token".to_string());
        }

        let manager = Self::new(token);
        manager.persist().await?;
        Ok(manager)
    }

    pub async fn persist(&self) -> Result<(), String> {
        let token = self.token.lock().await.clone();
        self.write(&token).await
    }

    async fn write(&self, token: &Token) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(token).map_err(|e| e.to_string())?;
        async_fs::write(&self.path, json)
            .await
            .map_err(|e| e.to_string())
    }

    pub async fn current_token(&self) -> Token {
        self.token.lock().await.clone()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Seconds until expiry, negative once expired.
    pub fn expires_in(token: &Token) -> i64 {
        let now = Utc::now().timestamp();
        (token.obtained_at + token.expires_in) as i64 - now
    }

    pub fn is_expired(token: &Token) -> bool {
        let now = Utc::now().timestamp() as u64;
        now >= (token.obtained_at + token.expires_in).saturating_sub(EXPIRY_MARGIN_SECS)
    }

    async fn refresh_locked(&self, token: &mut Token) -> Result<(), SyncError> {
        let client_id = self.client_id.as_deref().ok_or_else(|| {
            SyncError::Credential("SPOTIFY_API_AUTH_CLIENT_ID must be set to refresh".to_string())
        })?;
        if token.refresh_token.is_empty() {
            return Err(SyncError::Credential("no refresh token available".to_string()));
        }

        let fresh = spotify::auth::refresh_token(&self.token_url, client_id, &token.refresh_token)
            .await
            .map_err(SyncError::Credential)?;
        *token = fresh;
        debug!(expires_in = token.expires_in, "access token refreshed");

        if let Err(e) = self.write(token).await {
            warn!(error = %e, "failed to persist refreshed token");
        }
        Ok(())
    }

    fn token_path() -> PathBuf {
        config::data_dir().join("cache/token.json")
    }
}

#[async_trait]
impl CredentialProvider for TokenManager {
    async fn token(&self) -> Result<String, SyncError> {
        let mut token = self.token.lock().await;
        if token.access_token.is_empty() {
            return Err(SyncError::Credential("no access token".to_string()));
        }
        if Self::is_expired(&token) {
            self.refresh_locked(&mut token).await?;
        }
        Ok(token.access_token.clone())
    }

    async fn refresh(&self) -> Result<String, SyncError> {
        let mut token = self.token.lock().await;
        self.refresh_locked(&mut token).await?;
        Ok(token.access_token.clone())
    }
}

use async_trait::async_trait;

use super::error::{ApiError, SyncError};
use crate::types::RemoteSnapshot;

/// Supplies bearer tokens. Owned by whatever handles authentication.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Current access token, or `SyncError::Credential` when none is usable.
    async fn token(&self) -> Result<String, SyncError>;

    /// Obtains a fresh access token. Fails with `SyncError::Credential` when
    /// the refresh itself is rejected.
    async fn refresh(&self) -> Result<String, SyncError>;
}

/// The authoritative playback device.
#[async_trait]
pub trait PlaybackRemote: Send + Sync {
    /// `Ok(None)` means the remote explicitly reported that nothing is playing.
    async fn current_playback(&self, token: &str) -> Result<Option<RemoteSnapshot>, ApiError>;

    async fn set_play_pause(&self, token: &str, play: bool) -> Result<(), ApiError>;

    /// Replaces whatever is loaded on the device with `uri` and plays it.
    async fn play_track(&self, token: &str, uri: &str) -> Result<(), ApiError>;

    async fn seek(&self, token: &str, position_ms: u64) -> Result<(), ApiError>;

    async fn set_volume(&self, token: &str, percent: u8) -> Result<(), ApiError>;
}

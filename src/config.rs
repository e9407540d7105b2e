//! Configuration management for playsync.
//!
//! This module handles loading and accessing configuration values from environment
//! variables and `.env` files. It covers the Spotify Web API endpoints, the
//! credential refresh settings, the lyrics service and the timing of the
//! playback synchronizer.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults (where applicable)

use std::{env, path::PathBuf, time::Duration};

use tracing::warn;

pub const DEFAULT_SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_LYRICS_API_URL: &str = "https://api.lyrics.ovh/v1";

/// Loads environment variables from a `.env` file in the local data directory.
///
/// The file lives under `playsync/.env` in the platform-specific local data
/// directory:
/// - Linux: `~/.local/share/playsync/.env`
/// - macOS: `~/Library/Application Support/playsync/.env`
/// - Windows: `%LOCALAPPDATA%/playsync/.env`
///
/// A missing file is not an error; the process environment is used as is.
///
/// # Errors
///
/// Returns an error string if the directory cannot be created or the file
/// exists but cannot be parsed.
pub async fn load_env() -> Result<(), String> {
    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Root of everything playsync keeps on disk.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("playsync");
    path
}

/// Returns the Spotify Web API base URL (`SPOTIFY_API_URL`).
///
/// Defaults to `https://api.spotify.com/v1`.
pub fn spotify_apiurl() -> String {
    env::var("SPOTIFY_API_URL").unwrap_or_else(|_| DEFAULT_SPOTIFY_API_URL.to_string())
}

/// Returns the OAuth token endpoint used for the refresh grant
/// (`SPOTIFY_API_TOKEN_URL`).
pub fn spotify_apitoken_url() -> String {
    env::var("SPOTIFY_API_TOKEN_URL").unwrap_or_else(|_| DEFAULT_SPOTIFY_TOKEN_URL.to_string())
}

/// Returns the Spotify application client id (`SPOTIFY_API_AUTH_CLIENT_ID`).
///
/// # Errors
///
/// Fails when the variable is not set; refreshing a token is impossible
/// without it.
pub fn spotify_client_id() -> Result<String, String> {
    env::var("SPOTIFY_API_AUTH_CLIENT_ID")
        .ok()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| "SPOTIFY_API_AUTH_CLIENT_ID must be set".to_string())
}

/// Returns the lyrics service base URL (`LYRICS_API_URL`).
pub fn lyrics_apiurl() -> String {
    env::var("LYRICS_API_URL").unwrap_or_else(|_| DEFAULT_LYRICS_API_URL.to_string())
}

/// Returns an optional relay prefixed to lyric requests (`LYRICS_RELAY_URL`),
/// e.g. a CORS proxy.
pub fn lyrics_relay_url() -> Option<String> {
    env::var("LYRICS_RELAY_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
}

/// Timing of the playback synchronizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Full-state poll period.
    pub poll_interval: Duration,
    /// Progress interpolation period while a track is playing.
    pub progress_interval: Duration,
    /// Quiet period before a volume change is sent.
    pub volume_debounce: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            progress_interval: Duration::from_secs(1),
            volume_debounce: Duration::from_millis(500),
        }
    }
}

impl SyncConfig {
    /// Reads `PLAYSYNC_POLL_INTERVAL_MS`, `PLAYSYNC_PROGRESS_INTERVAL_MS` and
    /// `PLAYSYNC_VOLUME_DEBOUNCE_MS`, falling back to the defaults for unset
    /// or unparsable values.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            poll_interval: duration_var("PLAYSYNC_POLL_INTERVAL_MS", defaults.poll_interval),
            progress_interval: duration_var(
                "PLAYSYNC_PROGRESS_INTERVAL_MS",
                defaults.progress_interval,
            ),
            volume_debounce: duration_var("PLAYSYNC_VOLUME_DEBOUNCE_MS", defaults.volume_debounce),
        }
    }
}

impl SyncConfig {
    /// Replaces a zero poll or progress period, which a timer cannot run
    /// on, with the default. A zero volume debounce is valid and kept.
    pub fn or_defaults(self) -> Self {
        let defaults = Self::default();
        Self {
            poll_interval: nonzero("poll_interval", self.poll_interval, defaults.poll_interval),
            progress_interval: nonzero(
                "progress_interval",
                self.progress_interval,
                defaults.progress_interval,
            ),
            volume_debounce: self.volume_debounce,
        }
    }
}

fn nonzero(setting: &str, value: Duration, default: Duration) -> Duration {
    if value.is_zero() {
        warn!(setting, ?default, "zero period, using default");
        return default;
    }
    value
}

fn duration_var(name: &str, default: Duration) -> Duration {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
        .unwrap_or(default)
}

//! Spotify Playback Sync Library
//!
//! This library keeps a local view of Spotify playback consistent with the
//! user's active device. The remote device is authoritative but can only be
//! observed by polling, so the library reconciles polled state with optimistic
//! local changes (play/pause, seek, volume) and survives token expiry.
//!
//! # Modules
//!
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration management and environment variables
//! - `lyrics` - Lyric lookup for the current track
//! - `management` - Token cache and lyric cache
//! - `spotify` - Spotify Web API collaborators (player endpoints, token refresh)
//! - `sync` - The playback synchronizer
//! - `types` - Data structures and type definitions
//! - `utils` - Utility functions and helpers
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use playsync::{config, management::TokenManager, spotify::SpotifyPlayer, sync::PlaybackSync};
//!
//! #[tokio::main]
//! async fn main() -> playsync::Res<()> {
//!     config::load_env().await?;
//!     let sync = PlaybackSync::new(Arc::new(SpotifyPlayer::from_env()), config::SyncConfig::from_env());
//!     sync.start(Arc::new(TokenManager::load().await?)).await;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod lyrics;
pub mod management;
pub mod spotify;
pub mod sync;
pub mod types;
pub mod utils;

/// A convenient Result type alias for operations that may fail.
///
/// Uses a boxed dynamic error trait object with Send + Sync bounds so it can
/// cross await points in async contexts.
///
/// # Example
///
/// ```
/// use playsync::Res;
///
/// async fn fetch_data() -> Res<String> {
///     Ok("data".to_string())
/// }
/// ```
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```
/// info!("Polling {}", device_name);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// # Example
///
/// ```
/// success!("Volume set to {}%", percent);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only meant for the CLI layer: the library never terminates the process.
///
/// # Example
///
/// ```
/// error!("Failed to load token");
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// # Example
///
/// ```
/// warning!("Nothing is playing");
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}

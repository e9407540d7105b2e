//! # CLI Module
//!
//! The command-line view on top of the playback synchronizer. Every command
//! reads and changes playback through a [`PlaybackSync`] instance rather than
//! calling the Spotify API directly, so the terminal shows exactly what a
//! graphical view would render.
//!
//! ## Commands
//!
//! - [`now`] - Prints the current track as a table
//! - [`watch`] - Follows playback live with a progress bar, optionally with lyrics
//! - [`toggle`], [`seek`], [`volume`] - Playback control
//! - [`play`] - Searches for a track and plays the best match
//! - [`lyrics`] - Lyrics for the current track
//! - [`import_token`], [`token_status`] - Credential cache management
//!
//! ## Usage Patterns
//!
//! ```bash
//! playsync token import ~/spotify-token.json
//! playsync now
//! playsync volume 40
//! playsync seek 1:30
//! playsync play never gonna give you up
//! playsync watch --lyrics
//! ```

mod control;
mod lyrics;
mod now;
mod token;
mod watch;

pub use control::play;
pub use control::seek;
pub use control::toggle;
pub use control::volume;
pub use lyrics::lyrics;
pub use now::now;
pub use token::import_token;
pub use token::token_status;
pub use watch::watch;

use std::{sync::Arc, time::Duration};

use tokio::{sync::broadcast, time::timeout};

use crate::{
    config::SyncConfig,
    error,
    management::TokenManager,
    spotify::SpotifyPlayer,
    sync::{ErrorSource, PlaybackSync, SyncError, SyncEvent},
};

const FIRST_POLL_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) struct Connection {
    pub sync: PlaybackSync,
    pub events: broadcast::Receiver<SyncEvent>,
}

pub(crate) async fn load_tokens() -> Arc<TokenManager> {
    match TokenManager::load().await {
        Ok(t) => Arc::new(t),
        Err(e) => error!(
            "Failed to load token. Please run playsync token import <file>\n Error: {}",
            e
        ),
    }
}

/// Starts a synchronizer with the cached token and waits for the first poll.
pub(crate) async fn connect() -> Connection {
    connect_with(load_tokens().await).await
}

pub(crate) async fn connect_with(tokens: Arc<TokenManager>) -> Connection {
    let sync = PlaybackSync::new(Arc::new(SpotifyPlayer::from_env()), SyncConfig::from_env());
    let mut events = sync.subscribe();

    if !sync.start(tokens).await {
        error!("No usable Spotify credential. Please run playsync token import <file>");
    }

    match timeout(FIRST_POLL_TIMEOUT, first_poll(&mut events)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Cannot read playback state. Err: {}", e),
        Err(_) => error!("Timed out waiting for the playback state."),
    }

    Connection { sync, events }
}

async fn first_poll(events: &mut broadcast::Receiver<SyncEvent>) -> Result<(), SyncError> {
    loop {
        match events.recv().await {
            Ok(SyncEvent::State(_)) => return Ok(()),
            Ok(SyncEvent::Error {
                source: ErrorSource::Poll,
                error,
            }) => return Err(error),
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => {
                return Err(SyncError::Network("playback sync stopped".to_string()));
            }
        }
    }
}

//! # Playback Sync
//!
//! Keeps a local [`PlaybackState`] consistent with a remote, authoritative
//! playback device that can only be observed by polling.
//!
//! ## Overview
//!
//! [`PlaybackSync`] is a cheap, cloneable handle to a single engine task. The
//! engine owns the state exclusively: views read snapshots through
//! [`PlaybackSync::state`] or get them pushed through
//! [`PlaybackSync::subscribe`], and every mutation goes through one of the
//! `request_*` methods.
//!
//! ```text
//! handles ──commands──┐
//!                     ├──▶ engine queue ──▶ PlaybackState ──▶ watch / broadcast
//! network tasks ──────┘        ▲
//!                              └── poll timer, progress timer, volume debounce
//! ```
//!
//! ## Reconciliation
//!
//! - Requests are applied optimistically and confirmed or rolled back when
//!   the remote answers. A newer request of the same kind supersedes an older
//!   unconfirmed one; the older response is discarded on arrival.
//! - A poll never overwrites a field that has an unconfirmed request
//!   outstanding. Track, artwork and device metadata are always taken from
//!   the freshest poll.
//! - Progress is interpolated locally while playing and corrected by every
//!   poll.
//! - Volume changes are coalesced: only the last value of a burst is sent and
//!   only one volume request is ever in flight.
//! - A generation counter invalidates every response issued before
//!   [`PlaybackSync::stop`].
//!
//! ## Errors
//!
//! Nothing escapes as a failure. Errors are pushed to subscribers as
//! [`SyncEvent::Error`] and requests resolve to an [`Outcome`].
//!
//! ## Example
//!
//! ```rust,ignore
//! let sync = PlaybackSync::new(Arc::new(SpotifyPlayer::new(api_url)), SyncConfig::default());
//! if sync.start(Arc::new(token_manager)).await {
//!     let mut events = sync.subscribe();
//!     sync.request_volume(40).await;
//! }
//! ```

mod coalesce;
mod engine;
mod error;
mod remote;
mod session;

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::debug;

pub use coalesce::Coalescer;
pub use error::{ApiError, ErrorSource, IntentKind, Outcome, SyncError, SyncEvent};
pub use remote::{CredentialProvider, PlaybackRemote};
pub use session::Session;

use crate::{config::SyncConfig, types::PlaybackState, utils};
use engine::{Command, Engine, Message};

const EVENT_CAPACITY: usize = 64;

/// Handle to a running playback synchronizer.
///
/// The engine task lives as long as at least one handle does. Must be
/// created inside a tokio runtime.
#[derive(Clone)]
pub struct PlaybackSync {
    queue: mpsc::UnboundedSender<Message>,
    state: watch::Receiver<PlaybackState>,
    events: broadcast::Sender<SyncEvent>,
}

impl PlaybackSync {
    pub fn new(remote: Arc<dyn PlaybackRemote>, config: SyncConfig) -> Self {
        let (queue, inbox) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(PlaybackState::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let engine = Engine::new(
            remote,
            config.or_defaults(),
            queue.downgrade(),
            state_tx,
            events.clone(),
        );
        tokio::spawn(engine.run(inbox));

        Self {
            queue,
            state,
            events,
        }
    }

    /// Begins polling. Returns `false` without doing anything when the
    /// provider has no usable credential.
    pub async fn start(&self, credentials: Arc<dyn CredentialProvider>) -> bool {
        if let Err(e) = credentials.token().await {
            debug!(error = %e, "no usable credential, not starting");
            return false;
        }

        let (reply, started) = oneshot::channel();
        if self
            .queue
            .send(Message::Command(Command::Start { credentials, reply }))
            .is_err()
        {
            return false;
        }
        started.await.unwrap_or(false)
    }

    /// Cancels the timers and invalidates everything in flight. The last
    /// state stays readable. Calling it again does nothing.
    pub fn stop(&self) {
        let _ = self.queue.send(Message::Command(Command::Stop));
    }

    /// The current best-known state. Never blocks.
    pub fn state(&self) -> PlaybackState {
        self.state.borrow().clone()
    }

    /// Receives a [`SyncEvent`] after every applied change or reported error.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Flips the play state optimistically and asks the device to follow.
    pub async fn request_play_pause(&self) -> Outcome {
        self.request(|reply| Command::PlayPause { reply }).await
    }

    /// Plays the track `uri` (`spotify:track:...`). The state shows it as
    /// playing at once; the track itself is taken from the next poll, which
    /// is issued as soon as the device confirms.
    pub async fn request_play_track(&self, uri: impl Into<String>) -> Outcome {
        let uri = uri.into();
        self.request(|reply| Command::PlayTrack { uri, reply }).await
    }

    /// Moves playback to `position_ms`, clamped to the current track.
    pub async fn request_seek(&self, position_ms: u64) -> Outcome {
        self.request(|reply| Command::Seek { position_ms, reply })
            .await
    }

    /// Sets the volume, clamped to `[0, 100]`. Bursts are coalesced, so an
    /// earlier call resolves to [`Outcome::Superseded`] when a later one
    /// replaced it before it was sent.
    pub async fn request_volume(&self, percent: i64) -> Outcome {
        let percent = utils::clamp_volume(percent);
        self.request(|reply| Command::Volume { percent, reply })
            .await
    }

    async fn request(&self, command: impl FnOnce(oneshot::Sender<Outcome>) -> Command) -> Outcome {
        let (reply, outcome) = oneshot::channel();
        if self.queue.send(Message::Command(command(reply))).is_err() {
            return Outcome::Inactive;
        }
        outcome.await.unwrap_or(Outcome::Inactive)
    }
}

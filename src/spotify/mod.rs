//! # Spotify Integration Module
//!
//! Concrete collaborators for the playback synchronizer, talking to the
//! Spotify Web API over HTTP.
//!
//! ```text
//! PlaybackSync
//!     ├── PlaybackRemote      ← player::SpotifyPlayer  (GET/PUT /me/player/*)
//!     └── CredentialProvider  ← management::TokenManager
//!                                   └── auth::refresh_token (refresh grant)
//!          ↓
//! HTTP Layer (reqwest, JSON)
//!          ↓
//! Spotify Web API
//! ```
//!
//! ## Status mapping
//!
//! | HTTP status | result |
//! |---|---|
//! | 2xx | success (`204` on `/me/player` means nothing is playing) |
//! | 401 | `ApiError::Unauthorized`, triggers one refresh and retry |
//! | other | `ApiError::Rejected` carrying Spotify's error message |
//!
//! Transport failures become `ApiError::Network` and are retried only by the
//! next scheduled poll.

pub mod auth;
mod player;

pub use player::SpotifyPlayer;

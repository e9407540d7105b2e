use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::utils;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub scope: String,
    pub expires_in: u64,
    pub obtained_at: u64,
}

/// Immutable description of the track loaded on the remote device.
///
/// Snapshots are replaced wholesale on every poll; nothing mutates one in
/// place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSnapshot {
    pub id: String,
    pub title: String,
    pub artist_names: Vec<String>,
    pub album_name: String,
    pub artwork_url: Option<String>,
    pub duration_ms: u64,
}

impl TrackSnapshot {
    pub fn artists(&self) -> String {
        utils::join_artists(&self.artist_names)
    }
}

/// The state a view renders from.
///
/// `progress_ms` is always within `[0, duration_ms]` of the current track
/// (zero when there is none) and `volume_percent` within `[0, 100]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub track: Option<TrackSnapshot>,
    pub is_playing: bool,
    pub progress_ms: u64,
    pub volume_percent: u8,
    pub device_name: Option<String>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            track: None,
            is_playing: false,
            progress_ms: 0,
            volume_percent: 50,
            device_name: None,
        }
    }
}

impl PlaybackState {
    pub fn duration_ms(&self) -> u64 {
        self.track.as_ref().map_or(0, |t| t.duration_ms)
    }

    /// Clamps a position to the bounds of the current track.
    pub fn clamp_progress(&self, position_ms: u64) -> u64 {
        position_ms.min(self.duration_ms())
    }
}

/// What the remote device reported for an active session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSnapshot {
    pub track: TrackSnapshot,
    pub is_playing: bool,
    pub progress_ms: u64,
    pub volume_percent: Option<u8>,
    pub device_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentPlaybackResponse {
    pub is_playing: bool,
    pub progress_ms: Option<u64>,
    pub item: Option<PlaybackItem>,
    pub device: Option<Device>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackItem {
    pub id: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    pub name: String,
    pub duration_ms: u64,
    #[serde(default)]
    pub artists: Vec<ItemArtist>,
    pub album: Option<ItemAlbum>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemArtist {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemAlbum {
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: Option<String>,
    pub name: String,
    pub volume_percent: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub tracks: Option<SearchTracks>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchTracks {
    #[serde(default)]
    pub items: Vec<PlaybackItem>,
}

/// A playable search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackHit {
    pub uri: String,
    pub track: TrackSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub status: Option<u16>,
    pub message: String,
}

impl PlaybackItem {
    pub fn into_track(self) -> TrackSnapshot {
        let album = self.album.unwrap_or(ItemAlbum {
            name: String::new(),
            images: Vec::new(),
        });
        TrackSnapshot {
            // local files carry no id, fall back to the display name
            id: self.id.unwrap_or_else(|| self.name.clone()),
            title: self.name,
            artist_names: self.artists.into_iter().map(|a| a.name).collect(),
            album_name: album.name,
            artwork_url: album.images.into_iter().next().map(|i| i.url),
            duration_ms: self.duration_ms,
        }
    }
}

impl SearchResponse {
    /// Track results in ranking order. Items without a URI cannot be
    /// played and are skipped.
    pub fn into_hits(self) -> Vec<TrackHit> {
        self.tracks
            .map(|t| t.items)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|mut item| {
                let uri = item.uri.take()?;
                Some(TrackHit {
                    uri,
                    track: item.into_track(),
                })
            })
            .collect()
    }
}

impl CurrentPlaybackResponse {
    /// Converts the wire payload into a snapshot, `None` when no track is
    /// loaded on the device.
    pub fn into_snapshot(self) -> Option<RemoteSnapshot> {
        let track = self.item?.into_track();
        let progress_ms = self.progress_ms.unwrap_or(0).min(track.duration_ms);

        Some(RemoteSnapshot {
            track,
            is_playing: self.is_playing,
            progress_ms,
            volume_percent: self
                .device
                .as_ref()
                .and_then(|d| d.volume_percent)
                .map(|v| v.min(100) as u8),
            device_name: self.device.map(|d| d.name),
        })
    }
}

#[derive(Tabled)]
pub struct NowPlayingTableRow {
    pub title: String,
    pub artists: String,
    pub album: String,
    pub position: String,
    pub state: String,
    pub volume: String,
}

impl From<&PlaybackState> for NowPlayingTableRow {
    fn from(state: &PlaybackState) -> Self {
        let (title, artists, album) = match &state.track {
            Some(t) => (t.title.clone(), t.artists(), t.album_name.clone()),
            None => ("No track playing".to_string(), String::new(), String::new()),
        };

        NowPlayingTableRow {
            title,
            artists,
            album,
            position: format!(
                "{} / {}",
                utils::format_time(state.progress_ms),
                utils::format_time(state.duration_ms())
            ),
            state: if state.is_playing {
                "playing".to_string()
            } else {
                "paused".to_string()
            },
            volume: format!("{}%", state.volume_percent),
        }
    }
}

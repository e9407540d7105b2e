use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, header::CONTENT_LENGTH};
use serde_json::json;
use tracing::debug;

use crate::{
    config,
    sync::{ApiError, PlaybackRemote},
    types::{ApiErrorResponse, CurrentPlaybackResponse, RemoteSnapshot, SearchResponse, TrackHit},
};

// a request that hangs past this is a network failure
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The user's active Spotify Connect device, driven through the Web API
/// player endpoints.
#[derive(Debug, Clone)]
pub struct SpotifyPlayer {
    client: Client,
    api_url: String,
}

impl SpotifyPlayer {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_timeout(api_url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(api_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Uses `SPOTIFY_API_URL` or the public Web API.
    pub fn from_env() -> Self {
        Self::new(config::spotify_apiurl())
    }

    async fn put(&self, token: &str, path_and_query: &str) -> Result<(), ApiError> {
        let url = format!("{}{}", self.api_url, path_and_query);
        debug!(%url, "PUT");

        let response = self
            .client
            .put(&url)
            .bearer_auth(token)
            .header(CONTENT_LENGTH, 0)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        check_status(response).await.map(|_| ())
    }

    /// `GET /search?type=track`, best matches first.
    pub async fn search_tracks(
        &self,
        token: &str,
        query: &str,
        limit: u8,
    ) -> Result<Vec<TrackHit>, ApiError> {
        let url = format!("{}/search", self.api_url);
        let limit = limit.to_string();
        debug!(%url, query, "GET");

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[
                ("q", query),
                ("type", "track"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let results: SearchResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::Malformed(e.to_string()))?;
        Ok(results.into_hits())
    }
}

#[async_trait]
impl PlaybackRemote for SpotifyPlayer {
    /// `GET /me/player`. A `204 No Content` or a payload without an item
    /// means no active session.
    async fn current_playback(&self, token: &str) -> Result<Option<RemoteSnapshot>, ApiError> {
        let url = format!("{}/me/player", self.api_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let response = check_status(response).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        if body.trim().is_empty() {
            return Ok(None);
        }

        let playback: CurrentPlaybackResponse =
            serde_json::from_str(&body).map_err(|e| ApiError::Malformed(e.to_string()))?;
        Ok(playback.into_snapshot())
    }

    async fn set_play_pause(&self, token: &str, play: bool) -> Result<(), ApiError> {
        let endpoint = if play { "play" } else { "pause" };
        self.put(token, &format!("/me/player/{}", endpoint)).await
    }

    /// `PUT /me/player/play` with a `uris` body.
    async fn play_track(&self, token: &str, uri: &str) -> Result<(), ApiError> {
        let url = format!("{}/me/player/play", self.api_url);
        debug!(%url, uri, "PUT");

        let response = self
            .client
            .put(&url)
            .bearer_auth(token)
            .json(&json!({ "uris": [uri] }))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        check_status(response).await.map(|_| ())
    }

    async fn seek(&self, token: &str, position_ms: u64) -> Result<(), ApiError> {
        self.put(token, &format!("/me/player/seek?position_ms={}", position_ms))
            .await
    }

    async fn set_volume(&self, token: &str, percent: u8) -> Result<(), ApiError> {
        self.put(
            token,
            &format!("/me/player/volume?volume_percent={}", percent.min(100)),
        )
        .await
    }
}

/// Maps Spotify status codes onto [`ApiError`]. Error bodies look like
/// `{"error": {"status": 404, "message": "Player command failed: No active device found"}}`.
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized);
    }

    let fallback = status.canonical_reason().unwrap_or("unknown error").to_string();
    let message = match response.json::<ApiErrorResponse>().await {
        Ok(body) => body.error.message,
        Err(_) => fallback,
    };

    Err(ApiError::Rejected {
        status: status.as_u16(),
        message,
    })
}

//! Lyric lookup for the track on the device.
//!
//! Queries a lyrics.ovh compatible service, optionally through a relay that is
//! simply prefixed to the request URL. Artist and title are normalized first
//! because streaming metadata rarely matches the lyrics catalogue verbatim.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::config;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LyricLookup {
    Found(String),
    NotFound,
}

/// Anything that can answer "lyrics for (artist, title)".
#[async_trait]
pub trait LyricSource: Send + Sync {
    async fn lookup(&self, artist: &str, title: &str) -> Result<LyricLookup, String>;
}

#[derive(Debug, Deserialize)]
struct LyricsResponse {
    lyrics: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LyricsClient {
    client: Client,
    api_url: String,
    relay_url: Option<String>,
}

impl LyricsClient {
    pub fn new(api_url: impl Into<String>, relay_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            relay_url,
        }
    }

    pub fn from_env() -> Self {
        Self::new(config::lyrics_apiurl(), config::lyrics_relay_url())
    }

    pub fn request_url(&self, artist: &str, title: &str) -> String {
        let url = format!(
            "{}/{}/{}",
            self.api_url,
            urlencoding::encode(&clean_artist(artist)),
            urlencoding::encode(&clean_title(title))
        );
        match &self.relay_url {
            Some(relay) => format!("{}/{}", relay.trim_end_matches('/'), url),
            None => url,
        }
    }
}

#[async_trait]
impl LyricSource for LyricsClient {
    async fn lookup(&self, artist: &str, title: &str) -> Result<LyricLookup, String> {
        if artist.trim().is_empty() || title.trim().is_empty() {
            return Ok(LyricLookup::NotFound);
        }

        let url = self.request_url(artist, title);
        debug!(%url, "looking up lyrics");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(LyricLookup::NotFound),
            status if status.is_success() => {
                let body: LyricsResponse = response.json().await.map_err(|e| e.to_string())?;
                match body.lyrics {
                    Some(text) if !text.trim().is_empty() => Ok(LyricLookup::Found(text)),
                    _ => Ok(LyricLookup::NotFound),
                }
            }
            status => Err(format!("Failed to fetch lyrics: {}", status.as_u16())),
        }
    }
}

/// Drops parenthetical groups and everything after a `" -"` suffix.
pub fn clean_title(title: &str) -> String {
    let stripped = strip_parentheticals(title);
    let cut = match stripped.find(" -") {
        Some(idx) => &stripped[..idx],
        None => stripped.as_str(),
    };
    collapse_whitespace(cut)
}

/// Like [`clean_title`], and also drops featured artists (`feat. ...`).
pub fn clean_artist(artist: &str) -> String {
    let cleaned = clean_title(artist);
    let cut = match cleaned.find("feat.") {
        Some(idx) => &cleaned[..idx],
        None => cleaned.as_str(),
    };
    collapse_whitespace(cut)
}

fn strip_parentheticals(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut depth = 0usize;
    for c in value.chars() {
        match c {
            '(' => {
                depth += 1;
                out.push(' ');
            }
            ')' if depth > 0 => depth -= 1,
            _ if depth > 0 => {}
            _ => out.push(c),
        }
    }
    out
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

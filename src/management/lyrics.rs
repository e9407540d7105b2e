use std::collections::HashMap;

use crate::{
    lyrics::{LyricLookup, LyricSource},
    types::TrackSnapshot,
};

/// Lyric lookups keyed by track id, so a track is looked up at most once.
/// Failed lookups are not cached and will be tried again.
pub struct LyricCache {
    entries: HashMap<String, LyricLookup>,
}

impl LyricCache {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub async fn get_or_fetch(
        &mut self,
        track: &TrackSnapshot,
        source: &dyn LyricSource,
    ) -> Result<LyricLookup, String> {
        if let Some(hit) = self.entries.get(&track.id) {
            return Ok(hit.clone());
        }

        let artist = track.artist_names.first().cloned().unwrap_or_default();
        let lookup = source.lookup(&artist, &track.title).await?;
        self.entries.insert(track.id.clone(), lookup.clone());
        Ok(lookup)
    }

    pub fn get(&self, track_id: &str) -> Option<&LyricLookup> {
        self.entries.get(track_id)
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }
}

impl Default for LyricCache {
    fn default() -> Self {
        Self::new()
    }
}

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast::error::RecvError;

use crate::{
    cli::{Connection, connect},
    error,
    lyrics::{LyricLookup, LyricsClient},
    management::LyricCache,
    success,
    sync::{SyncError, SyncEvent},
    types::PlaybackState,
    utils::format_time,
    warning,
};

/// Follows playback until Ctrl-C, rendering every state change as a progress
/// bar. With `show_lyrics`, lyrics are printed once per track.
pub async fn watch(show_lyrics: bool) {
    let Connection { sync, mut events } = connect().await;

    let pb = ProgressBar::new(1);
    pb.set_style(
        ProgressStyle::with_template("{prefix:.bold} {wide_msg}\n{bar:50.green/white}")
            .unwrap()
            .progress_chars("━╸─"),
    );

    let lyric_source = LyricsClient::from_env();
    let mut lyric_cache = LyricCache::new();
    let mut shown_lyrics_for: Option<String> = None;

    let initial = sync.state();
    render(&pb, &initial);

    loop {
        let state = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(SyncEvent::State(state)) => state,
                Ok(SyncEvent::Error { error: SyncError::Credential(e), .. }) => {
                    sync.stop();
                    pb.finish_and_clear();
                    error!("Spotify rejected the credential, please import a new token. Err: {}", e);
                }
                Ok(SyncEvent::Error { source, error }) => {
                    pb.suspend(|| warning!("{:?}: {}", source, error));
                    continue;
                }
                Err(RecvError::Lagged(_)) => sync.state(),
                Err(RecvError::Closed) => break,
            },
        };

        render(&pb, &state);

        if show_lyrics {
            let Some(track) = &state.track else {
                continue;
            };
            if shown_lyrics_for.as_deref() == Some(track.id.as_str()) {
                continue;
            }
            shown_lyrics_for = Some(track.id.clone());

            match lyric_cache.get_or_fetch(track, &lyric_source).await {
                Ok(LyricLookup::Found(text)) => pb.println(format!("\n{}\n", text)),
                Ok(LyricLookup::NotFound) => {
                    pb.suspend(|| warning!("No lyrics found for {}", track.title))
                }
                Err(e) => pb.suspend(|| warning!("Cannot fetch lyrics. Err: {}", e)),
            }
        }
    }

    sync.stop();
    pb.finish_and_clear();
    success!("Stopped watching.");
}

fn render(pb: &ProgressBar, state: &PlaybackState) {
    pb.set_length(state.duration_ms().max(1));
    pb.set_position(state.progress_ms);
    pb.set_prefix(if state.is_playing { "▶" } else { "⏸" });

    let message = match &state.track {
        Some(track) => format!(
            "{} - {}  {} / {}  vol {}%",
            track.artists(),
            track.title,
            format_time(state.progress_ms),
            format_time(track.duration_ms),
            state.volume_percent
        ),
        None => format!("No track playing  vol {}%", state.volume_percent),
    };
    pb.set_message(message);
}

use crate::{
    cli::{connect, connect_with, load_tokens},
    error, info,
    spotify::SpotifyPlayer,
    sync::{Outcome, Session},
    success,
    utils::{self, format_time},
    warning,
};

const SEARCH_LIMIT: u8 = 5;

/// Searches Spotify for `query` and plays the best matching track on the
/// active device.
pub async fn play(query: String) {
    let tokens = load_tokens().await;
    let player = SpotifyPlayer::from_env();
    let session = Session::new(tokens.clone());

    let hits = match session
        .call(|token| {
            let (player, query) = (&player, query.as_str());
            async move { player.search_tracks(&token, query, SEARCH_LIMIT).await }
        })
        .await
    {
        Ok(hits) => hits,
        Err(e) => error!("Cannot search for '{}'. Err: {}", query, e),
    };

    let Some(hit) = hits.into_iter().next() else {
        warning!("No track matches '{}'.", query);
        return;
    };
    info!("Found {} - {}", hit.track.artists(), hit.track.title);

    let connection = connect_with(tokens).await;
    let outcome = connection.sync.request_play_track(hit.uri.as_str()).await;
    connection.sync.stop();

    report(&format!("Playing {}", hit.track.title), outcome);
}

/// Toggles between play and pause on the active device.
pub async fn toggle() {
    let connection = connect().await;
    let was_playing = connection.sync.state().is_playing;
    let outcome = connection.sync.request_play_pause().await;
    connection.sync.stop();

    let action = if was_playing { "Paused" } else { "Resumed" };
    report(action, outcome);
}

/// Seeks within the current track. Positions past the end are clamped.
pub async fn seek(position_ms: u64) {
    let connection = connect().await;
    let outcome = connection.sync.request_seek(position_ms).await;
    let state = connection.sync.state();
    connection.sync.stop();

    report(
        &format!(
            "Moved to {} / {}",
            format_time(state.progress_ms),
            format_time(state.duration_ms())
        ),
        outcome,
    );
}

/// Sets the device volume, clamped to 0-100.
pub async fn volume(percent: i64) {
    let connection = connect().await;
    let outcome = connection.sync.request_volume(percent).await;
    connection.sync.stop();

    report(
        &format!("Volume set to {}%", utils::clamp_volume(percent)),
        outcome,
    );
}

fn report(action: &str, outcome: Outcome) {
    match outcome {
        Outcome::Confirmed => success!("{}", action),
        Outcome::RolledBack(e) => error!("Request failed, nothing changed. Err: {}", e),
        Outcome::Superseded => warning!("Request was replaced by a newer one."),
        Outcome::Ignored => warning!("Nothing is playing."),
        Outcome::Inactive => error!("Playback sync is not running."),
    }
}

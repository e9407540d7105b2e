use crate::{
    cli::connect,
    error, info,
    lyrics::{LyricLookup, LyricsClient},
    management::LyricCache,
    warning,
};

/// Prints the lyrics of the current track.
pub async fn lyrics() {
    let connection = connect().await;
    let state = connection.sync.state();
    connection.sync.stop();

    let Some(track) = state.track else {
        warning!("Nothing is playing.");
        return;
    };

    let client = LyricsClient::from_env();
    let mut cache = LyricCache::new();
    match cache.get_or_fetch(&track, &client).await {
        Ok(LyricLookup::Found(text)) => {
            info!("{} - {}", track.artists(), track.title);
            println!("\n{}", text);
        }
        Ok(LyricLookup::NotFound) => warning!("No lyrics found for this track."),
        Err(e) => error!("Cannot fetch lyrics. Err: {}", e),
    }
}

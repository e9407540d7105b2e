use playsync::types::{
    CurrentPlaybackResponse, NowPlayingTableRow, PlaybackState, TrackSnapshot,
};
use playsync::utils::*;
use serde_json::json;

// Helper function to create a test track
fn create_test_track(id: &str, title: &str, duration_ms: u64) -> TrackSnapshot {
    TrackSnapshot {
        id: id.to_string(),
        title: title.to_string(),
        artist_names: vec!["Simon".to_string(), "Garfunkel".to_string()],
        album_name: "Bookends".to_string(),
        artwork_url: None,
        duration_ms,
    }
}

#[test]
fn test_format_time() {
    assert_eq!(format_time(0), "0:00");
    assert_eq!(format_time(999), "0:00");
    assert_eq!(format_time(61_000), "1:01");
    assert_eq!(format_time(213_573), "3:33");
    assert_eq!(format_time(3_600_000), "60:00");
}

#[test]
fn test_parse_position() {
    assert_eq!(parse_position("1:30"), Ok(90_000));
    assert_eq!(parse_position("0:05"), Ok(5_000));
    assert_eq!(parse_position(" 45000 "), Ok(45_000));
    assert_eq!(parse_position("12:00"), Ok(720_000));

    assert!(parse_position("1:60").is_err());
    assert!(parse_position("a:10").is_err());
    assert!(parse_position("-5").is_err());
    assert!(parse_position("").is_err());
}

#[test]
fn test_clamp_volume() {
    assert_eq!(clamp_volume(-20), 0);
    assert_eq!(clamp_volume(0), 0);
    assert_eq!(clamp_volume(57), 57);
    assert_eq!(clamp_volume(100), 100);
    assert_eq!(clamp_volume(150), 100);
    assert_eq!(clamp_volume(i64::MAX), 100);
}

#[test]
fn test_join_artists() {
    let names = vec!["Simon".to_string(), "Garfunkel".to_string()];
    assert_eq!(join_artists(&names), "Simon, Garfunkel");
    assert_eq!(join_artists(&[]), "");
}

#[test]
fn test_clamp_progress_bounds() {
    let mut state = PlaybackState::default();
    // no track means no room to move
    assert_eq!(state.clamp_progress(5_000), 0);

    state.track = Some(create_test_track("t1", "Mrs. Robinson", 244_000));
    assert_eq!(state.clamp_progress(5_000), 5_000);
    assert_eq!(state.clamp_progress(300_000), 244_000);
    assert_eq!(state.duration_ms(), 244_000);
}

#[test]
fn test_default_state() {
    let state = PlaybackState::default();
    assert_eq!(state.track, None);
    assert!(!state.is_playing);
    assert_eq!(state.progress_ms, 0);
    assert_eq!(state.volume_percent, 50);
}

#[test]
fn test_into_snapshot_clamps_and_falls_back() {
    // local file: no id, no album art, progress past the end, out of range volume
    let payload: CurrentPlaybackResponse = serde_json::from_value(json!({
        "is_playing": false,
        "progress_ms": 500_000,
        "device": { "id": null, "name": "Laptop", "volume_percent": 130 },
        "item": {
            "id": null,
            "name": "demo.mp3",
            "duration_ms": 120_000,
            "artists": [],
            "album": { "name": "", "images": [] }
        }
    }))
    .unwrap();

    let snapshot = payload.into_snapshot().unwrap();
    assert_eq!(snapshot.track.id, "demo.mp3");
    assert_eq!(snapshot.track.artwork_url, None);
    assert_eq!(snapshot.progress_ms, 120_000);
    assert_eq!(snapshot.volume_percent, Some(100));
    assert_eq!(snapshot.device_name.as_deref(), Some("Laptop"));
}

#[test]
fn test_into_snapshot_without_item_or_device() {
    let idle: CurrentPlaybackResponse = serde_json::from_value(json!({
        "is_playing": false,
        "progress_ms": null,
        "item": null,
        "device": null
    }))
    .unwrap();
    assert_eq!(idle.into_snapshot(), None);

    let headless: CurrentPlaybackResponse = serde_json::from_value(json!({
        "is_playing": true,
        "progress_ms": 1_000,
        "item": { "id": "x", "name": "X", "duration_ms": 2_000 }
    }))
    .unwrap();
    let snapshot = headless.into_snapshot().unwrap();
    assert_eq!(snapshot.volume_percent, None);
    assert_eq!(snapshot.device_name, None);
    assert_eq!(snapshot.track.album_name, "");
    assert!(snapshot.track.artist_names.is_empty());
}

#[test]
fn test_now_playing_table_row() {
    let state = PlaybackState {
        track: Some(create_test_track("t1", "The Boxer", 308_000)),
        is_playing: true,
        progress_ms: 65_000,
        volume_percent: 40,
        device_name: Some("Kitchen".to_string()),
    };

    let row = NowPlayingTableRow::from(&state);
    assert_eq!(row.title, "The Boxer");
    assert_eq!(row.artists, "Simon, Garfunkel");
    assert_eq!(row.album, "Bookends");
    assert_eq!(row.position, "1:05 / 5:08");
    assert_eq!(row.state, "playing");
    assert_eq!(row.volume, "40%");

    let idle = NowPlayingTableRow::from(&PlaybackState::default());
    assert_eq!(idle.title, "No track playing");
    assert_eq!(idle.position, "0:00 / 0:00");
    assert_eq!(idle.state, "paused");
}

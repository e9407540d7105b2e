use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Form, Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::Utc;
use playsync::{
    config::SyncConfig,
    management::TokenManager,
    spotify::SpotifyPlayer,
    sync::{ApiError, CredentialProvider, Outcome, PlaybackRemote, PlaybackSync, SyncError},
    types::Token,
};
use serde_json::json;

type Log = Arc<Mutex<Vec<String>>>;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn bearer(headers: &HeaderMap) -> String {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default()
        .to_string()
}

fn playback_body() -> serde_json::Value {
    json!({
        "is_playing": true,
        "progress_ms": 61_000,
        "device": { "id": "dev-1", "name": "Living Room", "volume_percent": 35 },
        "item": {
            "id": "4uLU6hMCjMI75M1A2tKUQC",
            "name": "Never Gonna Give You Up",
            "duration_ms": 213_573,
            "artists": [{ "name": "Rick Astley" }],
            "album": {
                "name": "Whenever You Need Somebody",
                "images": [
                    { "url": "https://i.scdn.co/image/large" },
                    { "url": "https://i.scdn.co/image/small" }
                ]
            }
        }
    })
}

async fn player(headers: HeaderMap) -> Response {
    match bearer(&headers).as_str() {
        "good" => Json(playback_body()).into_response(),
        "idle" => StatusCode::NO_CONTENT.into_response(),
        "ad-break" => Json(json!({ "is_playing": true, "progress_ms": 1000, "item": null }))
            .into_response(),
        "garbled" => "{ not json".into_response(),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": { "status": 401, "message": "The access token expired" } })),
        )
            .into_response(),
    }
}

async fn record(
    State(log): State<Log>,
    headers: HeaderMap,
    uri: axum::http::Uri,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    if bearer(&headers) != "good" {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let mut entry = uri.path().to_string();
    if let Some(position) = query.get("position_ms") {
        entry.push_str(&format!(" position_ms={}", position));
    }
    if let Some(volume) = query.get("volume_percent") {
        entry.push_str(&format!(" volume_percent={}", volume));
    }
    if !body.is_empty() {
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        entry.push_str(&format!(" uris={}", body["uris"]));
    }
    log.lock().unwrap().push(entry);
    StatusCode::NO_CONTENT.into_response()
}

async fn search(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if bearer(&headers) != "good" {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    assert_eq!(query["type"], "track");
    assert_eq!(query["limit"], "5");

    let items = match query["q"].as_str() {
        "never gonna" => json!([
            {
                "id": "4uLU6hMCjMI75M1A2tKUQC",
                "uri": "spotify:track:4uLU6hMCjMI75M1A2tKUQC",
                "name": "Never Gonna Give You Up",
                "duration_ms": 213_573,
                "artists": [{ "name": "Rick Astley" }],
                "album": { "name": "Whenever You Need Somebody", "images": [] }
            },
            {
                "id": null,
                "name": "never gonna (local file)",
                "duration_ms": 1_000
            },
            {
                "id": "7ycWLEP1GsNjVvcjawXz3z",
                "uri": "spotify:track:7ycWLEP1GsNjVvcjawXz3z",
                "name": "Never Gonna Give You Up - Cover",
                "duration_ms": 200_000,
                "artists": [{ "name": "Someone Else" }]
            }
        ]),
        _ => json!([]),
    };
    Json(json!({ "tracks": { "items": items } })).into_response()
}

async fn hang() -> Response {
    tokio::time::sleep(Duration::from_secs(30)).await;
    StatusCode::NO_CONTENT.into_response()
}

async fn no_device() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": { "status": 404, "message": "Player command failed: No active device found" }
        })),
    )
        .into_response()
}

async fn fake_spotify(log: Log) -> String {
    let app = Router::new()
        .route("/v1/me/player", get(player))
        .route("/v1/me/player/play", put(record))
        .route("/v1/me/player/pause", put(record))
        .route("/v1/me/player/seek", put(record))
        .route("/v1/me/player/volume", put(no_device))
        .route("/v1/search", get(search))
        .with_state(log);
    format!("{}/v1/", serve(app).await)
}

#[tokio::test]
async fn test_current_playback_maps_payload() {
    let api = fake_spotify(Log::default()).await;
    let player = SpotifyPlayer::new(api);

    let snapshot = player.current_playback("good").await.unwrap().unwrap();
    assert_eq!(snapshot.track.id, "4uLU6hMCjMI75M1A2tKUQC");
    assert_eq!(snapshot.track.title, "Never Gonna Give You Up");
    assert_eq!(snapshot.track.artist_names, vec!["Rick Astley".to_string()]);
    assert_eq!(snapshot.track.album_name, "Whenever You Need Somebody");
    assert_eq!(
        snapshot.track.artwork_url.as_deref(),
        Some("https://i.scdn.co/image/large")
    );
    assert_eq!(snapshot.track.duration_ms, 213_573);
    assert!(snapshot.is_playing);
    assert_eq!(snapshot.progress_ms, 61_000);
    assert_eq!(snapshot.volume_percent, Some(35));
    assert_eq!(snapshot.device_name.as_deref(), Some("Living Room"));
}

#[tokio::test]
async fn test_no_content_and_missing_item_mean_nothing_playing() {
    let api = fake_spotify(Log::default()).await;
    let player = SpotifyPlayer::new(api);

    assert_eq!(player.current_playback("idle").await, Ok(None));
    assert_eq!(player.current_playback("ad-break").await, Ok(None));
}

#[tokio::test]
async fn test_status_codes_map_to_api_errors() {
    let api = fake_spotify(Log::default()).await;
    let player = SpotifyPlayer::new(api);

    assert_eq!(
        player.current_playback("expired").await,
        Err(ApiError::Unauthorized)
    );
    assert!(matches!(
        player.current_playback("garbled").await,
        Err(ApiError::Malformed(_))
    ));
    assert_eq!(
        player.set_volume("good", 40).await,
        Err(ApiError::Rejected {
            status: 404,
            message: "Player command failed: No active device found".to_string(),
        })
    );
}

#[tokio::test]
async fn test_play_track_sends_uris_body() {
    let log = Log::default();
    let api = fake_spotify(log.clone()).await;
    let player = SpotifyPlayer::new(api);

    player
        .play_track("good", "spotify:track:4uLU6hMCjMI75M1A2tKUQC")
        .await
        .unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec![r#"/v1/me/player/play uris=["spotify:track:4uLU6hMCjMI75M1A2tKUQC"]"#.to_string()]
    );
}

#[tokio::test]
async fn test_search_tracks_returns_playable_hits_in_order() {
    let api = fake_spotify(Log::default()).await;
    let player = SpotifyPlayer::new(api);

    let hits = player.search_tracks("good", "never gonna", 5).await.unwrap();
    let uris: Vec<&str> = hits.iter().map(|h| h.uri.as_str()).collect();
    assert_eq!(
        uris,
        vec![
            "spotify:track:4uLU6hMCjMI75M1A2tKUQC",
            "spotify:track:7ycWLEP1GsNjVvcjawXz3z"
        ]
    );
    assert_eq!(hits[0].track.title, "Never Gonna Give You Up");
    assert_eq!(hits[0].track.artists(), "Rick Astley");
    assert_eq!(hits[1].track.album_name, "");

    assert_eq!(player.search_tracks("good", "zzzz", 5).await, Ok(Vec::new()));
    assert_eq!(
        player.search_tracks("expired", "never gonna", 5).await,
        Err(ApiError::Unauthorized)
    );
}

#[tokio::test]
async fn test_hanging_request_times_out_as_network_error() {
    let app = Router::new().route("/v1/me/player", get(hang));
    let api = format!("{}/v1", serve(app).await);
    let player = SpotifyPlayer::with_timeout(api, Duration::from_millis(200));

    assert!(matches!(
        player.current_playback("good").await,
        Err(ApiError::Network(_))
    ));
}

#[tokio::test]
async fn test_unreachable_api_is_a_network_error() {
    // nothing listens on the discard port
    let player = SpotifyPlayer::new("http://127.0.0.1:9");
    assert!(matches!(
        player.current_playback("good").await,
        Err(ApiError::Network(_))
    ));
}

#[tokio::test]
async fn test_mutations_hit_player_endpoints() {
    let log = Log::default();
    let api = fake_spotify(log.clone()).await;
    let player = SpotifyPlayer::new(api);

    player.set_play_pause("good", true).await.unwrap();
    player.set_play_pause("good", false).await.unwrap();
    player.seek("good", 90_500).await.unwrap();
    assert_eq!(
        player.seek("bad", 1).await,
        Err(ApiError::Unauthorized)
    );

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "/v1/me/player/play".to_string(),
            "/v1/me/player/pause".to_string(),
            "/v1/me/player/seek position_ms=90500".to_string(),
        ]
    );
}

fn token(access_token: &str, refresh_token: &str, expired: bool) -> Token {
    let now = Utc::now().timestamp() as u64;
    Token {
        access_token: access_token.to_string(),
        refresh_token: refresh_token.to_string(),
        scope: "user-read-playback-state user-modify-playback-state".to_string(),
        expires_in: 3600,
        obtained_at: if expired { now - 7200 } else { now },
    }
}

fn temp_token_path(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("playsync-test-{}-{}", name, std::process::id()))
        .join("token.json")
}

#[derive(Clone, Default)]
struct TokenEndpoint {
    grants: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

async fn grant(
    State(endpoint): State<TokenEndpoint>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    endpoint.grants.lock().unwrap().push(form.clone());
    match form.get("refresh_token").map(String::as_str) {
        Some("behind-gateway") => (
            StatusCode::BAD_GATEWAY,
            [("content-type", "text/html")],
            "<html><body>502 Bad Gateway</body></html>",
        )
            .into_response(),
        Some("valid-refresh") => Json(json!({
            "access_token": "good",
            "token_type": "Bearer",
            "scope": "user-read-playback-state user-modify-playback-state",
            "expires_in": 3600
        }))
        .into_response(),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": "Refresh token revoked" })),
        )
            .into_response(),
    }
}

async fn fake_accounts(endpoint: TokenEndpoint) -> String {
    let app = Router::new()
        .route("/api/token", post(grant))
        .with_state(endpoint);
    format!("{}/api/token", serve(app).await)
}

#[tokio::test]
async fn test_refresh_keeps_refresh_token_and_persists() {
    let endpoint = TokenEndpoint::default();
    let token_url = fake_accounts(endpoint.clone()).await;
    let path = temp_token_path("refresh");

    let manager = TokenManager::new(token("stale", "valid-refresh", false))
        .with_path(&path)
        .with_endpoint(token_url, "client-123");

    assert_eq!(manager.refresh().await, Ok("good".to_string()));

    let grants = endpoint.grants.lock().unwrap().clone();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0]["grant_type"], "refresh_token");
    assert_eq!(grants[0]["client_id"], "client-123");

    let current = manager.current_token().await;
    assert_eq!(current.refresh_token, "valid-refresh");
    assert!(!TokenManager::is_expired(&current));

    let reloaded = TokenManager::load_from(&path).await.unwrap();
    assert_eq!(reloaded.current_token().await.access_token, "good");
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[tokio::test]
async fn test_expired_token_is_refreshed_before_use() {
    let endpoint = TokenEndpoint::default();
    let token_url = fake_accounts(endpoint.clone()).await;
    let path = temp_token_path("expired");

    let manager = TokenManager::new(token("old", "valid-refresh", true))
        .with_path(&path)
        .with_endpoint(token_url, "client-123");

    assert_eq!(manager.token().await, Ok("good".to_string()));
    // fresh now, no second grant
    assert_eq!(manager.token().await, Ok("good".to_string()));
    assert_eq!(endpoint.grants.lock().unwrap().len(), 1);
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[tokio::test]
async fn test_revoked_refresh_token_is_a_credential_error() {
    let endpoint = TokenEndpoint::default();
    let token_url = fake_accounts(endpoint).await;
    let path = temp_token_path("revoked");

    let manager = TokenManager::new(token("old", "revoked", false))
        .with_path(&path)
        .with_endpoint(token_url, "client-123");

    match manager.refresh().await {
        Err(SyncError::Credential(reason)) => assert!(reason.contains("Refresh token revoked")),
        other => panic!("expected credential error, got {:?}", other),
    }
    assert_eq!(manager.current_token().await.access_token, "old");
    assert!(!path.exists());
}

#[tokio::test]
async fn test_non_json_refresh_error_keeps_the_status() {
    let endpoint = TokenEndpoint::default();
    let token_url = fake_accounts(endpoint).await;

    let manager = TokenManager::new(token("old", "behind-gateway", false))
        .with_path(temp_token_path("gateway"))
        .with_endpoint(token_url, "client-123");

    assert_eq!(
        manager.refresh().await,
        Err(SyncError::Credential("HTTP 502: Bad Gateway".to_string()))
    );
}

#[tokio::test]
async fn test_empty_access_token_is_not_a_credential() {
    let manager = TokenManager::new(token("", "valid-refresh", false))
        .with_path(temp_token_path("empty"))
        .with_endpoint("http://127.0.0.1:9/api/token", "client-123");

    assert!(matches!(
        manager.token().await,
        Err(SyncError::Credential(_))
    ));
}

#[tokio::test]
async fn test_sync_recovers_from_expired_token_end_to_end() {
    let log = Log::default();
    let api = fake_spotify(log.clone()).await;
    let endpoint = TokenEndpoint::default();
    let token_url = fake_accounts(endpoint.clone()).await;
    let path = temp_token_path("e2e");

    // the cached token looks valid locally but Spotify already revoked it
    let manager = TokenManager::new(token("revoked-upstream", "valid-refresh", false))
        .with_path(&path)
        .with_endpoint(token_url, "client-123");

    let sync = PlaybackSync::new(Arc::new(SpotifyPlayer::new(api)), SyncConfig::default());
    let mut events = sync.subscribe();
    assert!(sync.start(Arc::new(manager)).await);

    let first = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .unwrap()
        .unwrap();
    match first {
        playsync::sync::SyncEvent::State(state) => {
            assert_eq!(
                state.track.map(|t| t.title),
                Some("Never Gonna Give You Up".to_string())
            );
            assert_eq!(state.volume_percent, 35);
        }
        other => panic!("expected a state update, got {:?}", other),
    }
    assert_eq!(endpoint.grants.lock().unwrap().len(), 1);

    assert_eq!(sync.request_play_pause().await, Outcome::Confirmed);
    assert!(!sync.state().is_playing);
    assert!(log.lock().unwrap().contains(&"/v1/me/player/pause".to_string()));

    sync.stop();
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

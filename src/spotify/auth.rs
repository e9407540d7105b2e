use chrono::Utc;
use reqwest::Client;
use serde_json::Value;

use crate::types::Token;

/// Refreshes an expired access token using a refresh token.
///
/// Exchanges a refresh token for a new access token at the OAuth token
/// endpoint (`grant_type=refresh_token`), so playback control keeps working
/// without the user authorizing again.
///
/// # Arguments
///
/// * `token_url` - OAuth token endpoint
/// * `client_id` - Spotify application client id
/// * `refresh_token` - Refresh token from the previous grant
///
/// # Returns
///
/// - `Ok(Token)` - New token. Spotify may or may not rotate the refresh
///   token; when the response omits it the previous one is kept.
/// - `Err(String)` - Transport failure, a non-success status (typically
///   `400 invalid_grant` for a revoked refresh token) or a response without
///   an access token.
///
/// # Example
///
/// ```
/// let new_token = refresh_token(&token_url, &client_id, "AQC...refresh_token").await?;
/// println!("New access token expires in {} seconds", new_token.expires_in);
/// ```
pub async fn refresh_token(
    token_url: &str,
    client_id: &str,
    refresh_token: &str,
) -> Result<Token, String> {
    let client = Client::new();
    let res = client
        .post(token_url)
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", client_id),
        ])
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let status = res.status();
    let body = res.text().await.map_err(|e| e.to_string())?;
    // gateways answer with HTML, so the body is only JSON when we are lucky
    let json: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    if !status.is_success() {
        let reason = json["error_description"]
            .as_str()
            .or_else(|| json["error"].as_str())
            .or_else(|| status.canonical_reason())
            .unwrap_or("refresh rejected");
        return Err(format!("HTTP {}: {}", status.as_u16(), reason));
    }

    let access_token = json["access_token"]
        .as_str()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| "token response carries no access_token".to_string())?;

    Ok(Token {
        access_token: access_token.to_string(),
        refresh_token: json["refresh_token"]
            .as_str()
            .unwrap_or(refresh_token)
            .to_string(),
        scope: json["scope"].as_str().unwrap_or_default().to_string(),
        expires_in: json["expires_in"].as_i64().unwrap_or(3600) as u64,
        obtained_at: Utc::now().timestamp() as u64,
    })
}


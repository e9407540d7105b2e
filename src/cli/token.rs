use std::path::PathBuf;

use crate::{error, info, management::TokenManager, success, warning};

/// Stores a token JSON (as returned by Spotify's token endpoint plus an
/// `obtained_at` timestamp) in the local cache.
pub async fn import_token(source: PathBuf) {
    match TokenManager::import(&source).await {
        Ok(manager) => success!("Token stored at {}", manager.path().display()),
        Err(e) => error!("Cannot import token from {}. Err: {}", source.display(), e),
    }
}

/// Shows whether the cached token is still valid.
pub async fn token_status() {
    let manager = match TokenManager::load().await {
        Ok(m) => m,
        Err(e) => error!(
            "Failed to load token. Please run playsync token import <file>\n Error: {}",
            e
        ),
    };

    let token = manager.current_token().await;
    info!("Token cache: {}", manager.path().display());
    info!("Scope: {}", token.scope);

    let remaining = TokenManager::expires_in(&token);
    if remaining > 0 {
        info!("Access token expires in {}s", remaining);
    } else {
        warning!("Access token expired {}s ago, it will be refreshed on next use.", -remaining);
    }
}

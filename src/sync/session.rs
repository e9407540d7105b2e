use std::{future::Future, sync::Arc};

use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{
    error::{ApiError, SyncError},
    remote::CredentialProvider,
};

/// Runs remote calls with the single-retry-after-refresh policy.
///
/// Every call first uses the provider's current token. An authorization
/// failure triggers one refresh and one retry; a second authorization failure
/// becomes `SyncError::Credential`. The token generation counter makes
/// concurrent calls that failed with the same stale token share a single
/// refresh instead of each rotating the credential.
pub struct Session {
    provider: Arc<dyn CredentialProvider>,
    generation: Mutex<u64>,
}

impl Session {
    pub fn new(provider: Arc<dyn CredentialProvider>) -> Self {
        Self {
            provider,
            generation: Mutex::new(0),
        }
    }

    pub async fn call<T, F, Fut>(&self, op: F) -> Result<T, SyncError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let (token, seen) = self.current().await?;

        match op(token).await {
            Err(ApiError::Unauthorized) => {}
            other => return other.map_err(SyncError::from),
        }

        debug!(generation = seen, "remote call unauthorized, refreshing credential");
        let token = self.refresh_after(seen).await?;

        match op(token).await {
            Err(ApiError::Unauthorized) => {
                warn!("refreshed credential was rejected");
                Err(SyncError::Credential(
                    "refreshed credential was rejected".to_string(),
                ))
            }
            other => other.map_err(SyncError::from),
        }
    }

    async fn current(&self) -> Result<(String, u64), SyncError> {
        let generation = self.generation.lock().await;
        let token = self.provider.token().await?;
        Ok((token, *generation))
    }

    async fn refresh_after(&self, seen: u64) -> Result<String, SyncError> {
        let mut generation = self.generation.lock().await;
        if *generation != seen {
            // someone else already rotated the token we failed with
            return self.provider.token().await;
        }

        let token = self.provider.refresh().await?;
        *generation += 1;
        Ok(token)
    }
}

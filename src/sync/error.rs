use thiserror::Error;

use crate::types::PlaybackState;

/// Failures a collaborator call can report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("authorization rejected")]
    Unauthorized,
    #[error("request rejected with HTTP status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Conditions reported to subscribers. None of them is fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Transient; the next scheduled poll is the retry.
    #[error("network error: {0}")]
    Network(String),
    /// Refresh failed or the refreshed credential was rejected too. The user
    /// has to authenticate again.
    #[error("credential error: {0}")]
    Credential(String),
    /// The remote accepted the request but refused the mutation.
    #[error("remote rejected the request (HTTP {status}): {message}")]
    RemoteRejected { status: u16, message: String },
}

impl From<ApiError> for SyncError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized => SyncError::Credential("authorization rejected".to_string()),
            ApiError::Rejected { status, message } => SyncError::RemoteRejected { status, message },
            ApiError::Network(msg) => SyncError::Network(msg),
            ApiError::Malformed(msg) => SyncError::Network(format!("malformed response: {}", msg)),
        }
    }
}

/// How an intent ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The remote acknowledged the mutation; the optimistic value stands.
    Confirmed,
    /// The remote refused or could not be reached; the field was restored.
    RolledBack(SyncError),
    /// A newer intent of the same kind replaced this one before it resolved.
    Superseded,
    /// There was nothing to act on.
    Ignored,
    /// Sync is not running, or was stopped before the intent resolved.
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentKind {
    PlayPause,
    PlayTrack,
    Seek,
    Volume,
}

/// Where a reported error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSource {
    Poll,
    Intent(IntentKind),
}

/// Pushed to subscribers after every applied mutation or reported failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    State(PlaybackState),
    Error { source: ErrorSource, error: SyncError },
}

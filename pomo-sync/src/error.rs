//! Error types shared by the agent and its collaborators.
//!
//! None of these are fatal. The agent logs them and degrades to defaults or
//! skips the optional effect.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] std::io::Error),

    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(#[from] serde_json::Error),

    /// Decoded fine but breaks a snapshot invariant.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(&'static str),

    #[error("bus unavailable: {0}")]
    BusUnavailable(String),
}

/// Failures reported by an [`AlarmPlayer`](crate::alarm::AlarmPlayer).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlarmError {
    /// The environment refused playback. Another agent may still be able to play it.
    #[error("playback blocked")]
    PlaybackBlocked,

    /// This agent has no way to play sound at all.
    #[error("no alarm output available")]
    Unavailable,

    #[error("alarm failed: {0}")]
    Failed(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;

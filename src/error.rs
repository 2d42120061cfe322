use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal errors. A request that hits one of these produces no partial
/// results; per-target failures are [`TargetError`] instead.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Invalid search pattern: {0}")]
    PatternInvalid(String),

    #[error("Request has no targets")]
    NoTargets,

    #[error("Broker error: {0}")]
    Broker(#[from] redis::RedisError),

    #[error("Malformed payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, WorkerError>;

/// Failure scoped to a single target. Recorded in the report next to the
/// matches from targets that did scan; the batch keeps going.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetError {
    pub target: String,
    pub kind: TargetErrorKind,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetErrorKind {
    /// Target file could not be opened.
    Unreadable,
    /// Disk image could not be mounted.
    MountFailure,
    /// The search tool exited abnormally while scanning the target.
    SearchCapability,
}

impl std::fmt::Display for TargetErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetErrorKind::Unreadable => write!(f, "unreadable"),
            TargetErrorKind::MountFailure => write!(f, "mount_failure"),
            TargetErrorKind::SearchCapability => write!(f, "search_capability"),
        }
    }
}

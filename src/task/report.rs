use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TargetError;
use crate::task::TaskStatus;

/// One line of context around a match, as printed by `grep -C`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextLine {
    pub line_number: u64,
    pub line: String,
}

/// One matching line in a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub path: PathBuf,
    pub line_number: u64,
    pub line: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<ContextLine>,
}

/// Outcome of one search request. Matches are ordered by target input
/// order, then line order within a target. Per-target errors ride along
/// with whatever matches the rest of the batch produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchReport {
    pub request_id: Uuid,
    pub status: TaskStatus,
    pub matches: Vec<Match>,
    pub errors: Vec<TargetError>,
    /// Set when the whole request failed before any target was touched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fatal: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl SearchReport {
    /// Report for a request that failed outright (bad pattern, no targets).
    pub fn fatal(request_id: Uuid, started_at: DateTime<Utc>, detail: String) -> Self {
        Self {
            request_id,
            status: TaskStatus::Failed,
            matches: Vec::new(),
            errors: Vec::new(),
            fatal: Some(detail),
            started_at,
            completed_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }
}

//! Search task execution.
//!
//! A [`SearchRequest`] names a pattern and a set of targets (plain files or
//! disk images). [`SearchTask::run`] resolves each target in input order,
//! mounting images read-only first, invokes the search capability per file,
//! and collects matches and per-target errors into a [`SearchReport`].
//!
//! # Lifecycle
//!
//! *Pending → Mounting (images only) → Scanning → Completed/Failed*
//!
//! A per-target failure does not abort the batch unless the request sets
//! `fail_fast`; an invalid pattern fails the whole request before any
//! target is touched.

pub mod report;

pub use report::{ContextLine, Match, SearchReport};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, TargetError, TargetErrorKind, WorkerError};
use crate::mount::{MountedImage, Mounter};
use crate::search::{SearchError, SearchOptions, Searcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Mounting,
    Scanning,
    Completed,
    Failed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Mounting => write!(f, "mounting"),
            TaskStatus::Scanning => write!(f, "scanning"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A file path or disk-image reference to be searched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum Target {
    /// Readable file, searched directly
    File(PathBuf),
    /// Disk image, mounted read-only and searched file by file
    Image(PathBuf),
}

impl Target {
    pub fn path(&self) -> &Path {
        match self {
            Target::File(p) | Target::Image(p) => p,
        }
    }
}

/// Job payload delivered by the task-queue broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub id: Uuid,
    pub pattern: String,
    pub targets: Vec<Target>,
    #[serde(default)]
    pub case_insensitive: bool,
    #[serde(default)]
    pub context_lines: Option<u32>,
    #[serde(default)]
    pub fail_fast: bool,
    pub submitted_at: DateTime<Utc>,
}

impl SearchRequest {
    pub fn new(pattern: impl Into<String>, targets: Vec<Target>) -> Self {
        Self {
            id: Uuid::new_v4(),
            pattern: pattern.into(),
            targets,
            case_insensitive: false,
            context_lines: None,
            fail_fast: false,
            submitted_at: Utc::now(),
        }
    }
}

/// Executes search requests against a search capability and a mounter.
pub struct SearchTask {
    searcher: Arc<dyn Searcher>,
    mounter: Arc<dyn Mounter>,
}

impl SearchTask {
    pub fn new(searcher: Arc<dyn Searcher>, mounter: Arc<dyn Mounter>) -> Self {
        Self { searcher, mounter }
    }

    /// Run one request to completion.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::PatternInvalid`] for an empty or uncompilable
    /// pattern and [`WorkerError::NoTargets`] for an empty target list, in
    /// both cases before any target is touched. Per-target failures do not
    /// surface here; they are recorded in the report's error list.
    pub async fn run(&self, request: &SearchRequest) -> Result<SearchReport> {
        let started_at = Utc::now();
        tracing::debug!(
            request_id = %request.id,
            status = %TaskStatus::Pending,
            targets = request.targets.len(),
            "Accepted search request"
        );

        if request.pattern.is_empty() {
            return Err(WorkerError::PatternInvalid("empty pattern".to_string()));
        }
        if request.targets.is_empty() {
            return Err(WorkerError::NoTargets);
        }
        self.searcher
            .compile_check(&request.pattern)
            .await
            .map_err(|e| match e {
                SearchError::PatternInvalid(detail) => WorkerError::PatternInvalid(detail),
                SearchError::Spawn(io) => WorkerError::Io(io),
                other => WorkerError::Internal(other.to_string()),
            })?;

        let opts = SearchOptions {
            case_insensitive: request.case_insensitive,
            context_lines: request.context_lines,
        };

        let scan_start = Instant::now();
        let mut matches: Vec<Match> = Vec::new();
        let mut errors: Vec<TargetError> = Vec::new();
        let mut scanned_files = 0usize;

        'targets: for target in &request.targets {
            match target {
                Target::File(path) => {
                    if self.scan_file(request, path, opts, &mut matches, &mut errors).await {
                        scanned_files += 1;
                    } else if request.fail_fast {
                        break 'targets;
                    }
                }
                Target::Image(image) => {
                    tracing::debug!(
                        request_id = %request.id,
                        image = %image.display(),
                        status = %TaskStatus::Mounting,
                        "Mounting disk image"
                    );
                    let mounted =
                        match MountedImage::acquire(self.mounter.clone(), image).await {
                            Ok(mounted) => mounted,
                            Err(e) => {
                                errors.push(TargetError {
                                    target: image.display().to_string(),
                                    kind: TargetErrorKind::MountFailure,
                                    detail: e.to_string(),
                                });
                                if request.fail_fast {
                                    break 'targets;
                                }
                                continue;
                            }
                        };

                    let files = mounted.files().to_vec();
                    let mut aborted = false;
                    for file in &files {
                        if self.scan_file(request, file, opts, &mut matches, &mut errors).await {
                            scanned_files += 1;
                        } else if request.fail_fast {
                            aborted = true;
                            break;
                        }
                    }
                    // Unmount before deciding anything else; the image must
                    // be released on every exit path.
                    if let Err(e) = mounted.release().await {
                        tracing::warn!(
                            request_id = %request.id,
                            image = %image.display(),
                            error = %e,
                            "Unmount failed"
                        );
                    }
                    if aborted {
                        break 'targets;
                    }
                }
            }

            let elapsed = scan_start.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 {
                (matches.len() as f64 / elapsed) as u64
            } else {
                0
            };
            tracing::info!(
                request_id = %request.id,
                target = %target.path().display(),
                matches = matches.len(),
                rate_per_sec = rate,
                "Target done"
            );
        }

        let status = if request.fail_fast && !errors.is_empty() {
            TaskStatus::Failed
        } else if scanned_files == 0 && !errors.is_empty() {
            TaskStatus::Failed
        } else {
            TaskStatus::Completed
        };

        tracing::info!(
            request_id = %request.id,
            status = %status,
            matches = matches.len(),
            errors = errors.len(),
            "Search request finished"
        );

        Ok(SearchReport {
            request_id: request.id,
            status,
            matches,
            errors,
            fatal: None,
            started_at,
            completed_at: Utc::now(),
        })
    }

    /// Scan a single resolved file. Matches go to `matches` in line order;
    /// a failure is recorded in `errors` and reported via the return value.
    async fn scan_file(
        &self,
        request: &SearchRequest,
        path: &Path,
        opts: SearchOptions,
        matches: &mut Vec<Match>,
        errors: &mut Vec<TargetError>,
    ) -> bool {
        if let Err(e) = tokio::fs::File::open(path).await {
            errors.push(TargetError {
                target: path.display().to_string(),
                kind: TargetErrorKind::Unreadable,
                detail: e.to_string(),
            });
            return false;
        }

        match self.searcher.search(&request.pattern, path, opts).await {
            Ok(mut found) => {
                tracing::debug!(
                    request_id = %request.id,
                    path = %path.display(),
                    matches = found.len(),
                    status = %TaskStatus::Scanning,
                    "Scanned file"
                );
                matches.append(&mut found);
                true
            }
            Err(e) => {
                errors.push(TargetError {
                    target: path.display().to_string(),
                    kind: TargetErrorKind::SearchCapability,
                    detail: e.to_string(),
                });
                false
            }
        }
    }
}

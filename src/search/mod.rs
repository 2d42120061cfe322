//! Text-search capability.
//!
//! The matching engine is not ours: [`GrepSearcher`] shells out to the
//! external `grep` binary. The [`Searcher`] trait is the seam the task
//! layer works against, so tests can substitute a mock.

pub mod grep;

pub use grep::GrepSearcher;

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::task::Match;

/// Per-search flags forwarded to the search tool.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOptions {
    pub case_insensitive: bool,
    /// Lines of context around each match, `grep -C` style
    pub context_lines: Option<u32>,
}

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Pattern rejected by search tool: {0}")]
    PatternInvalid(String),

    #[error("Failed to spawn search tool: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Search tool failed (exit {code:?}): {stderr}")]
    Tool { code: Option<i32>, stderr: String },
}

#[async_trait]
pub trait Searcher: Send + Sync {
    /// Verify the pattern compiles, without touching any target.
    async fn compile_check(&self, pattern: &str) -> Result<(), SearchError>;

    /// Search one file. Matches come back in line order; a file with no
    /// occurrences yields an empty vec, not an error.
    async fn search(
        &self,
        pattern: &str,
        file: &Path,
        opts: SearchOptions,
    ) -> Result<Vec<Match>, SearchError>;
}

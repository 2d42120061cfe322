//! Shared helpers and mock collaborators for integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use grep_worker::broker::Broker;
use grep_worker::config::GrepConfig;
use grep_worker::error::Result;
use grep_worker::mount::{Mount, MountError, Mounter};
use grep_worker::search::{GrepSearcher, SearchError, SearchOptions, Searcher};
use grep_worker::task::{Match, SearchReport, SearchRequest, SearchTask};

/// Write a fixture file and return its path.
pub fn write_fixture(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

/// Task wired to the real grep binary. The mounter is a mock so tests do
/// not need mount privileges.
pub fn grep_task(mounter: Arc<MockMounter>) -> SearchTask {
    SearchTask::new(Arc::new(GrepSearcher::new(GrepConfig::default())), mounter)
}

/// Task wired to the real grep binary and a mounter that is never used.
pub fn file_task() -> SearchTask {
    grep_task(Arc::new(MockMounter::new()))
}

/// Mounter that treats an image path as a plain directory and counts
/// mount/unmount calls, so tests can assert the release invariant
/// without mount privileges.
#[derive(Default)]
pub struct MockMounter {
    mounts: AtomicUsize,
    unmounts: AtomicUsize,
    fail_mount: bool,
}

impl MockMounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_mount: true,
            ..Self::default()
        }
    }

    pub fn mount_count(&self) -> usize {
        self.mounts.load(Ordering::SeqCst)
    }

    pub fn unmount_count(&self) -> usize {
        self.unmounts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Mounter for MockMounter {
    async fn mount(&self, image: &Path) -> std::result::Result<Mount, MountError> {
        if self.fail_mount {
            return Err(MountError::Tool {
                code: Some(32),
                stderr: "wrong fs type, bad option, bad superblock".to_string(),
            });
        }
        self.mounts.fetch_add(1, Ordering::SeqCst);
        let mut files: Vec<PathBuf> = std::fs::read_dir(image)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<_>>()?;
        files.retain(|p| p.is_file());
        files.sort();
        Ok(Mount {
            image: image.to_path_buf(),
            mount_point: image.to_path_buf(),
            files,
        })
    }

    async fn unmount(&self, _mount: &Mount) -> std::result::Result<(), MountError> {
        self.unmounts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn unmount_blocking(&self, _mount: &Mount) {
        self.unmounts.fetch_add(1, Ordering::SeqCst);
    }
}

/// Searcher that records whether it was touched. Used to assert that
/// invalid requests fail before any target is scanned.
#[derive(Default)]
pub struct CountingSearcher {
    compile_checks: AtomicUsize,
    searches: AtomicUsize,
}

impl CountingSearcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compile_check_count(&self) -> usize {
        self.compile_checks.load(Ordering::SeqCst)
    }

    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Searcher for CountingSearcher {
    async fn compile_check(&self, _pattern: &str) -> std::result::Result<(), SearchError> {
        self.compile_checks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn search(
        &self,
        _pattern: &str,
        _file: &Path,
        _opts: SearchOptions,
    ) -> std::result::Result<Vec<Match>, SearchError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

/// Searcher that fails every scan with a tool error.
pub struct FailingSearcher;

#[async_trait]
impl Searcher for FailingSearcher {
    async fn compile_check(&self, _pattern: &str) -> std::result::Result<(), SearchError> {
        Ok(())
    }

    async fn search(
        &self,
        _pattern: &str,
        _file: &Path,
        _opts: SearchOptions,
    ) -> std::result::Result<Vec<Match>, SearchError> {
        Err(SearchError::Tool {
            code: Some(2),
            stderr: "boom".to_string(),
        })
    }
}

/// In-memory broker: hands out queued requests, collects published
/// reports, and cancels the token once the queue is drained so worker
/// loop tests terminate.
pub struct MockBroker {
    requests: Mutex<VecDeque<SearchRequest>>,
    pub published: Arc<Mutex<Vec<SearchReport>>>,
    token: CancellationToken,
}

impl MockBroker {
    pub fn new(requests: Vec<SearchRequest>, token: CancellationToken) -> Self {
        Self {
            requests: Mutex::new(requests.into()),
            published: Arc::new(Mutex::new(Vec::new())),
            token,
        }
    }
}

#[async_trait]
impl Broker for MockBroker {
    async fn next_request(&mut self) -> Result<Option<SearchRequest>> {
        let next = self.requests.lock().unwrap().pop_front();
        if next.is_none() {
            self.token.cancel();
        }
        Ok(next)
    }

    async fn publish_report(&mut self, report: &SearchReport) -> Result<()> {
        self.published.lock().unwrap().push(report.clone());
        Ok(())
    }
}

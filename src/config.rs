use std::path::PathBuf;

/// Environment variable holding the broker connection string.
pub const BROKER_URL_ENV: &str = "REDIS_URL";

/// Configuration for the worker process.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Broker connection string (e.g. "redis://127.0.0.1:6379")
    pub broker_url: String,
    /// Queue the broker pushes search requests onto
    pub request_queue: String,
    /// Queue search reports are published to
    pub result_queue: String,
    /// Blocking-pop timeout in seconds; the loop wakes up this often to
    /// check for shutdown
    pub pop_timeout_secs: f64,
    /// Directory mount points for disk images are created under
    pub mount_root: PathBuf,
    /// Abort a batch on the first per-target error
    pub fail_fast: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            broker_url: "redis://127.0.0.1:6379".to_string(),
            request_queue: "grep-worker:requests".to_string(),
            result_queue: "grep-worker:results".to_string(),
            pop_timeout_secs: 5.0,
            mount_root: PathBuf::from("/tmp/grep-worker/mounts"),
            fail_fast: false,
        }
    }
}

impl WorkerConfig {
    /// Default configuration with the broker URL taken from `REDIS_URL`
    /// when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(BROKER_URL_ENV) {
            config.broker_url = url;
        }
        config
    }
}

/// Configuration for the external grep binary.
#[derive(Debug, Clone)]
pub struct GrepConfig {
    /// Binary to invoke
    pub binary: String,
    /// Treat patterns as POSIX extended regular expressions (-E)
    pub extended: bool,
    /// Per-file match cap (-m); 0 means unlimited
    pub max_matches: u64,
}

impl Default for GrepConfig {
    fn default() -> Self {
        Self {
            binary: "grep".to_string(),
            extended: true,
            max_matches: 0,
        }
    }
}

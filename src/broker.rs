//! Task-queue broker connection.
//!
//! The broker is an external collaborator: it hands us serialized
//! [`SearchRequest`] payloads and takes back serialized
//! [`SearchReport`]s. The Redis implementation uses one blocking list
//! per direction with JSON payloads.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::config::WorkerConfig;
use crate::error::Result;
use crate::task::{SearchReport, SearchRequest};

#[async_trait]
pub trait Broker: Send {
    /// Wait for the next request. `None` means the poll timed out and the
    /// caller should loop (checking for shutdown in between).
    async fn next_request(&mut self) -> Result<Option<SearchRequest>>;

    /// Publish the report for a finished request.
    async fn publish_report(&mut self, report: &SearchReport) -> Result<()>;
}

pub struct RedisBroker {
    conn: MultiplexedConnection,
    request_queue: String,
    result_queue: String,
    pop_timeout_secs: f64,
}

impl RedisBroker {
    pub async fn connect(config: &WorkerConfig) -> Result<Self> {
        let client = redis::Client::open(config.broker_url.as_str())?;
        let conn = client.get_multiplexed_async_connection().await?;
        tracing::info!(
            request_queue = %config.request_queue,
            result_queue = %config.result_queue,
            "Connected to broker"
        );
        Ok(Self {
            conn,
            request_queue: config.request_queue.clone(),
            result_queue: config.result_queue.clone(),
            pop_timeout_secs: config.pop_timeout_secs,
        })
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn next_request(&mut self) -> Result<Option<SearchRequest>> {
        let popped: Option<(String, String)> = self
            .conn
            .blpop(&self.request_queue, self.pop_timeout_secs)
            .await?;
        match popped {
            Some((_queue, payload)) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn publish_report(&mut self, report: &SearchReport) -> Result<()> {
        let payload = serde_json::to_string(report)?;
        let _: () = self.conn.lpush(&self.result_queue, payload).await?;
        Ok(())
    }
}

//! Worker poll loop.
//!
//! One worker owns one broker connection and executes requests to
//! completion, one at a time. Concurrency is a deployment concern:
//! run more worker processes. Every request that reaches the loop
//! produces a report, even when the task fails outright or shutdown
//! was requested while the request was being popped.

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::broker::Broker;
use crate::error::WorkerError;
use crate::task::{SearchReport, SearchRequest, SearchTask};

/// Delay before retrying after a broker error.
const BROKER_RETRY_DELAY: Duration = Duration::from_secs(3);

pub struct Worker<B: Broker> {
    broker: B,
    task: SearchTask,
    fail_fast: bool,
}

impl<B: Broker> Worker<B> {
    pub fn new(broker: B, task: SearchTask) -> Self {
        Self {
            broker,
            task,
            fail_fast: false,
        }
    }

    /// Abort batches on the first per-target error, even for requests
    /// that did not ask for it themselves.
    pub fn with_fail_fast(mut self, enabled: bool) -> Self {
        self.fail_fast = enabled;
        self
    }

    /// Run until the token is cancelled. A pop already in flight is
    /// awaited to completion: the broker may have dequeued a request by
    /// the time the signal arrives, and that request must still be
    /// executed and reported. The broker's pop timeout bounds how long
    /// shutdown waits between token checks.
    pub async fn run(mut self, token: CancellationToken) {
        tracing::info!(fail_fast = self.fail_fast, "Worker started");
        while !token.is_cancelled() {
            match self.broker.next_request().await {
                Ok(Some(request)) => self.handle(request).await,
                Ok(None) => {} // poll timeout, go around
                Err(e @ WorkerError::Payload(_)) => {
                    tracing::warn!(error = %e, "Discarding malformed job payload");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Broker error");
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tokio::time::sleep(BROKER_RETRY_DELAY) => {}
                    }
                }
            }
        }
        tracing::info!("Worker stopped");
    }

    async fn handle(&mut self, mut request: SearchRequest) {
        if self.fail_fast {
            request.fail_fast = true;
        }
        let accepted_at = Utc::now();
        tracing::info!(
            request_id = %request.id,
            pattern = %request.pattern,
            targets = request.targets.len(),
            fail_fast = request.fail_fast,
            "Executing search request"
        );

        let report = match self.task.run(&request).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(request_id = %request.id, error = %e, "Search request failed");
                SearchReport::fatal(request.id, accepted_at, e.to_string())
            }
        };

        if let Err(e) = self.broker.publish_report(&report).await {
            tracing::error!(request_id = %request.id, error = %e, "Failed to publish report");
        }
    }
}

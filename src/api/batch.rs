//! Bounded-concurrency batch execution
//!
//! All requests of a batch run on the caller's task. A semaphore caps how many
//! are in flight; results are collected in submission order regardless of
//! completion order.

use super::client::PagerDutyClient;
use super::error::EngineError;
use super::request::RequestSpec;
use super::result::{ApiFailure, ApiResult, BatchResult};
use futures::future::join_all;
use log::debug;
use std::time::Instant;
use tokio::sync::Semaphore;

impl PagerDutyClient {
    /// Execute every spec with at most `concurrency` requests in flight.
    ///
    /// One failed request never affects the others; the result for `specs[i]`
    /// is at index `i`.
    pub async fn run_batch(
        &self,
        specs: &[RequestSpec],
        concurrency: usize,
    ) -> Result<BatchResult, EngineError> {
        if concurrency == 0 {
            return Err(EngineError::InvalidConcurrency);
        }
        if specs.is_empty() {
            return Ok(BatchResult::default());
        }

        let started = Instant::now();
        let permits = Semaphore::new(concurrency);
        debug!(
            "Running batch of {} requests with concurrency {}",
            specs.len(),
            concurrency
        );

        let permits = &permits;
        let tasks = specs.iter().map(|spec| async move {
            let _permit = match permits.acquire().await {
                Ok(permit) => permit,
                Err(_) => {
                    return ApiResult::Failure(ApiFailure::transport("batch was cancelled", 0));
                }
            };
            self.execute(spec).await
        });
        let results: Vec<ApiResult> = join_all(tasks).await;

        let batch = BatchResult::new(results);
        self.api_logger().log_batch_operation(
            batch.len(),
            batch.success_count(),
            concurrency,
            started.elapsed(),
        );

        Ok(batch)
    }

    /// [`run_batch`](Self::run_batch) with the configured concurrency
    pub async fn run_batch_default(&self, specs: &[RequestSpec]) -> Result<BatchResult, EngineError> {
        self.run_batch(specs, self.config().concurrency).await
    }
}

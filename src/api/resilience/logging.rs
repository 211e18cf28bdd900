//! Structured logging with correlation tracking for PagerDuty API calls
//!
//! Each event is logged as a single JSON payload through the `log` facade so
//! that a run's log file can be filtered by correlation id.

use super::config::{LogLevel, MonitoringConfig};
use crate::api::result::ApiResult;
use log::{debug, error, info, trace, warn};
use reqwest::header::HeaderMap;
use serde_json::json;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Structured logger for API operations with correlation tracking
#[derive(Debug, Clone)]
pub struct ApiLogger {
    config: MonitoringConfig,
}

/// Context for a single API call
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub correlation_id: String,
    pub method: String,
    pub endpoint: String,
    pub start_time: Instant,
}

impl ApiLogger {
    pub fn new(config: MonitoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MonitoringConfig {
        &self.config
    }

    /// Start tracking a new operation
    pub fn start_operation(&self, method: &str, endpoint: &str) -> OperationContext {
        let correlation_id = if self.config.correlation_ids {
            uuid::Uuid::new_v4().to_string()
        } else {
            String::from("-")
        };

        let context = OperationContext {
            correlation_id,
            method: method.to_string(),
            endpoint: endpoint.to_string(),
            start_time: Instant::now(),
        };

        if self.config.request_logging && self.should_log(&LogLevel::Trace) {
            let log_data = json!({
                "event": "operation_started",
                "correlation_id": context.correlation_id,
                "method": context.method,
                "endpoint": context.endpoint,
                "timestamp": chrono::Utc::now().to_rfc3339()
            });

            trace!("API Operation Started: {}", log_data);
        }

        context
    }

    /// Log HTTP request details
    pub fn log_request(&self, context: &OperationContext, url: &str, headers: &HeaderMap, attempt: u32) {
        if !self.config.request_logging || !self.should_log(&LogLevel::Debug) {
            return;
        }

        let log_data = json!({
            "event": "http_request",
            "correlation_id": context.correlation_id,
            "method": context.method,
            "url": url,
            "attempt": attempt,
            "headers": sanitize_headers(headers),
            "timestamp": chrono::Utc::now().to_rfc3339()
        });

        debug!("HTTP Request: {}", log_data);
    }

    /// Log HTTP response details
    pub fn log_response(&self, context: &OperationContext, status_code: u16, duration: Duration) {
        if !self.config.request_logging || !self.should_log(&LogLevel::Debug) {
            return;
        }

        let log_data = json!({
            "event": "http_response",
            "correlation_id": context.correlation_id,
            "method": context.method,
            "endpoint": context.endpoint,
            "status_code": status_code,
            "duration_ms": duration.as_millis(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        });

        if status_code >= 400 {
            warn!("HTTP Response (Error): {}", log_data);
        } else {
            debug!("HTTP Response: {}", log_data);
        }
    }

    /// Log a rate-limit retry
    pub fn log_retry(&self, context: &OperationContext, retry: u32, delay: Duration) {
        if !self.should_log(&LogLevel::Warn) {
            return;
        }

        let log_data = json!({
            "event": "retry_attempt",
            "correlation_id": context.correlation_id,
            "method": context.method,
            "endpoint": context.endpoint,
            "retry": retry,
            "reason": "rate_limited",
            "delay_ms": delay.as_millis(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        });

        warn!("Retry Attempt: {}", log_data);
    }

    /// Complete an operation and log its outcome
    pub fn complete_operation(&self, context: &OperationContext, result: &ApiResult) {
        if !self.config.performance_metrics || !self.should_log(&LogLevel::Info) {
            return;
        }

        let log_data = json!({
            "event": "operation_completed",
            "correlation_id": context.correlation_id,
            "method": context.method,
            "endpoint": context.endpoint,
            "duration_ms": context.elapsed().as_millis(),
            "retries": result.retries(),
            "success": result.is_success(),
            "status_code": result.status(),
            "error_message": result.failure().map(|f| f.formatted()),
            "timestamp": chrono::Utc::now().to_rfc3339()
        });

        if result.is_success() {
            info!("API Operation Completed: {}", log_data);
        } else {
            error!("API Operation Failed: {}", log_data);
        }
    }

    /// Log batch completion
    pub fn log_batch_operation(&self, operation_count: usize, success_count: usize, concurrency: usize, duration: Duration) {
        if !self.config.performance_metrics || !self.should_log(&LogLevel::Info) {
            return;
        }

        let log_data = json!({
            "event": "batch_completed",
            "operation_count": operation_count,
            "success_count": success_count,
            "failure_count": operation_count - success_count,
            "concurrency": concurrency,
            "duration_ms": duration.as_millis(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        });

        info!("Batch Operation Completed: {}", log_data);
    }

    /// Log the end of a paginated fetch
    pub fn log_pagination(&self, endpoint: &str, pages: usize, items: usize, duration: Duration) {
        if !self.config.performance_metrics || !self.should_log(&LogLevel::Info) {
            return;
        }

        let log_data = json!({
            "event": "pagination_completed",
            "endpoint": endpoint,
            "pages": pages,
            "items": items,
            "duration_ms": duration.as_millis(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        });

        info!("Pagination Completed: {}", log_data);
    }

    /// Check if we should log at the given level
    fn should_log(&self, level: &LogLevel) -> bool {
        match (&self.config.log_level, level) {
            (LogLevel::Error, LogLevel::Error) => true,
            (LogLevel::Warn, LogLevel::Error | LogLevel::Warn) => true,
            (LogLevel::Info, LogLevel::Error | LogLevel::Warn | LogLevel::Info) => true,
            (LogLevel::Debug, LogLevel::Error | LogLevel::Warn | LogLevel::Info | LogLevel::Debug) => true,
            (LogLevel::Trace, _) => true,
            _ => false,
        }
    }
}

impl OperationContext {
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Sanitize headers to remove sensitive information
fn sanitize_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            let key = name.as_str().to_lowercase();
            let shown = if key.contains("authorization") || key.contains("token") || key.contains("key") {
                "[REDACTED]".to_string()
            } else {
                value.to_str().unwrap_or("[binary]").to_string()
            };
            (name.as_str().to_string(), shown)
        })
        .collect()
}

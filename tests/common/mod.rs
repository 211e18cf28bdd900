//! Shared helpers for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use pagerduty_cli::api::{
    ClientConfig, Credential, HttpRequest, HttpResponse, HttpTransport, PagerDutyClient,
    RetryableError, TransportError,
};
use reqwest::header::HeaderMap;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Fast retries so throttling tests finish quickly
pub fn test_config(base_url: &str) -> ClientConfig {
    ClientConfig::builder()
        .base_url(base_url)
        .max_retries(5)
        .retry_delay(Duration::from_millis(5))
        .request_timeout(Duration::from_secs(5))
        .build()
}

pub fn bearer_client(base_url: &str) -> PagerDutyClient {
    PagerDutyClient::new(
        Some(Credential::Bearer("test-token".to_string())),
        test_config(base_url),
    )
    .expect("client")
}

/// `count` items of the form `{"id": "<prefix><n>", "name": ...}`
pub fn items(prefix: &str, start: usize, count: usize) -> Vec<Value> {
    (start..start + count)
        .map(|n| json!({"id": format!("{}{:05}", prefix, n), "name": format!("item {}", n)}))
        .collect()
}

/// In-memory backend that records how many requests are in flight.
///
/// Requests whose path ends in one of `failing` get a 500; all others
/// succeed with `{"path": <path>}` after `latency`.
pub struct InstrumentedTransport {
    latency: Duration,
    failing: HashSet<String>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    total: AtomicUsize,
    dispatched: Mutex<Vec<String>>,
}

impl InstrumentedTransport {
    pub fn new(latency: Duration, failing: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            latency,
            failing: failing.iter().map(|s| s.to_string()).collect(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
            dispatched: Mutex::new(Vec::new()),
        })
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    /// Last path segments in the order requests reached the backend
    pub fn dispatch_order(&self) -> Vec<String> {
        self.dispatched.lock().unwrap().clone()
    }

    pub fn client(self: &Arc<Self>) -> PagerDutyClient {
        PagerDutyClient::with_transport(
            Some(Credential::Bearer("test-token".to_string())),
            test_config("https://api.example.test"),
            Arc::clone(self) as Arc<dyn HttpTransport>,
        )
        .expect("client")
    }
}

#[async_trait]
impl HttpTransport for InstrumentedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);

        let path = request.url.path().to_string();
        let last = path.rsplit('/').next().unwrap_or_default().to_string();
        self.dispatched.lock().unwrap().push(last.clone());

        // Vary completion order so index alignment is actually exercised
        let jitter = last.parse::<u64>().map(|n| (n * 7) % 5).unwrap_or(0);
        tokio::time::sleep(self.latency + Duration::from_millis(jitter)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if last == "unreachable" {
            return Err(TransportError::new(RetryableError::Network, "connection refused"));
        }
        let status = if self.failing.contains(&last) { 500 } else { 200 };
        let body = if status == 200 {
            json!({"path": path}).to_string()
        } else {
            json!({"error": {"message": "boom", "code": 9999}}).to_string()
        };

        Ok(HttpResponse {
            status,
            headers: HeaderMap::new(),
            body: body.into_bytes(),
        })
    }
}

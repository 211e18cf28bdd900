//! The network seam of the engine
//!
//! The executor talks to an [`HttpTransport`] rather than to reqwest directly,
//! which keeps retry and result handling independent of the HTTP stack.

use super::constants;
use super::error::EngineError;
use super::resilience::{ClientConfig, RetryableError};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Method, Url};
use std::time::Duration;
use thiserror::Error;

/// A fully prepared request: URL resolved, headers merged, body serialized
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// No usable response was received
#[derive(Debug, Clone, Error)]
#[error("{}: {message}", .kind.label())]
pub struct TransportError {
    pub kind: RetryableError,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: RetryableError, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    fn from_reqwest(error: reqwest::Error) -> Self {
        let kind = RetryableError::from_reqwest_error(&error);

        // reqwest's top-level message hides the cause (DNS, refused, reset)
        let mut message = error.to_string();
        let mut source = std::error::Error::source(&error);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }

        Self { kind, message }
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Default transport backed by a pooled reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(config.concurrency.max(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(constants::USER_AGENT)
            .build()
            .map_err(EngineError::HttpClient)?;

        Ok(Self { client })
    }

    /// Use an already configured reqwest client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(TransportError::from_reqwest)?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(TransportError::from_reqwest)?
            .to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

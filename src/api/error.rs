//! Error types for the request engine

use super::result::ApiFailure;
use thiserror::Error;

/// Errors that stop the engine before or outside of a network call.
///
/// Network and API conditions never show up here directly; they resolve to a
/// failed [`ApiResult`](super::ApiResult). The only way one reaches this type
/// is through [`EngineError::Request`], when a caller asked for a value that
/// a failed request could not produce (a paginated fetch, a lookup).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no PagerDuty credential is configured; run `pd auth add` or set PD_TOKEN")]
    NoCredential,

    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("batch concurrency must be at least 1")]
    InvalidConcurrency,

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error(transparent)]
    Request(#[from] ApiFailure),
}

/// Misuse of a result accessor.
///
/// Reading the payload of a failure, or the error of a success, is a caller
/// bug rather than a runtime condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("data() called on a failed result")]
    DataOnFailure,

    #[error("formatted_error() called on a successful result")]
    ErrorOnSuccess,
}

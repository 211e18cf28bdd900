//! PagerDuty REST API request engine
//!
//! Authentication, a retrying request executor, a paginator, a bounded
//! concurrency batch scheduler and lookup helpers built on top of them.

pub mod auth;
pub mod batch;
pub mod client;
pub mod constants;
pub mod error;
pub mod lookup;
pub mod pagination;
pub mod request;
pub mod resilience;
pub mod result;
pub mod transport;

pub use auth::{Authenticator, Credential};
pub use client::PagerDutyClient;
pub use error::{AccessError, EngineError};
pub use pagination::FetchOptions;
pub use request::{QueryParams, QueryValue, RequestSpec, RequestSpecBuilder};
pub use resilience::{ApiLogger, ClientConfig, ClientConfigBuilder, LogLevel, MonitoringConfig, OperationContext, RetryConfig, RetryPolicy, RetryableError};
pub use result::{ApiFailure, ApiResult, BatchResult, FailureKind};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError};

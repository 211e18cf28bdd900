//! Retry policy, engine configuration and structured logging
//!
//! Provides rate-limit retries with bounded attempts, the client
//! configuration with its builder, and correlation-tracked API logging.

pub mod config;
pub mod logging;
pub mod retry;

pub use config::{ClientConfig, ClientConfigBuilder, LogLevel, MonitoringConfig};
pub use logging::{ApiLogger, OperationContext};
pub use retry::{RetryConfig, RetryPolicy, RetryableError};

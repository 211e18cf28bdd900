//! API Constants and Configuration for the PagerDuty REST API

/// Default REST API host
pub const DEFAULT_BASE_URL: &str = "https://api.pagerduty.com";

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("pagerduty-cli/", env!("CARGO_PKG_VERSION"));

/// Standard headers for PagerDuty requests
pub mod headers {
    /// Versioned media type required by the v2 REST API
    pub const ACCEPT_V2: &str = "application/vnd.pagerduty+json;version=2";

    /// Content type for JSON request bodies
    pub const CONTENT_TYPE_JSON: &str = "application/json";

    /// Seconds until the current rate-limit window resets
    pub const RATELIMIT_RESET: &str = "ratelimit-reset";

    /// Standard retry hint, honoured when the PagerDuty-specific one is absent
    pub const RETRY_AFTER: &str = "retry-after";

    /// Acting user for legacy API keys on write endpoints
    pub const FROM: &str = "From";

    /// Opt-in header for early-access endpoints (custom fields)
    pub const EARLY_ACCESS: &str = "X-EARLY-ACCESS";
}

/// Pagination parameter and response field names
pub mod pagination {
    pub const LIMIT: &str = "limit";
    pub const OFFSET: &str = "offset";
    pub const CURSOR: &str = "cursor";
    pub const MORE: &str = "more";
    pub const NEXT_CURSOR: &str = "next_cursor";

    /// Page size used when the caller does not pick one
    pub const DEFAULT_PAGE_SIZE: usize = 25;
}

/// Defaults for the request engine
pub mod defaults {
    use std::time::Duration;

    /// Requests in flight at once for a batch
    pub const CONCURRENCY: usize = 20;

    /// Total time allowed for one HTTP exchange
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
}

//! Success/failure outcomes of executing request specifications

use super::error::AccessError;
use reqwest::StatusCode;
use serde_json::Value;
use std::fmt;

const MAX_RAW_BODY_IN_ERROR: usize = 200;

/// Why a request failed
#[derive(Debug, Clone, PartialEq)]
pub enum FailureKind {
    /// Non-success status; fields come from the structured error body when present
    Api {
        message: Option<String>,
        code: Option<i64>,
        errors: Vec<String>,
        raw_body: Option<String>,
    },
    /// Still throttled after the retry budget was spent; `message` is the
    /// API's error message from the last 429 body
    RateLimited { message: Option<String> },
    /// No response was received (DNS, connect, timeout, reset)
    Transport(String),
    /// Success status but the body was not JSON
    MalformedResponse(String),
}

/// The failure side of an [`ApiResult`]
#[derive(Debug, Clone, PartialEq)]
pub struct ApiFailure {
    pub status: Option<u16>,
    pub kind: FailureKind,
    /// Rate-limit retries performed before giving up
    pub retries: u32,
}

impl ApiFailure {
    pub fn transport(error: impl Into<String>, retries: u32) -> Self {
        Self {
            status: None,
            kind: FailureKind::Transport(error.into()),
            retries,
        }
    }

    /// Build a failure from the last throttled response
    pub fn rate_limited(body: &[u8], retries: u32) -> Self {
        let status = StatusCode::TOO_MANY_REQUESTS.as_u16();
        let message = match Self::from_response(status, body, retries).kind {
            FailureKind::Api {
                message: Some(message),
                ..
            } => Some(message),
            _ => None,
        };

        Self {
            status: Some(status),
            kind: FailureKind::RateLimited { message },
            retries,
        }
    }

    pub fn malformed(status: u16, detail: impl Into<String>, retries: u32) -> Self {
        Self {
            status: Some(status),
            kind: FailureKind::MalformedResponse(detail.into()),
            retries,
        }
    }

    /// Build a failure from an error response, extracting the API's error object
    pub fn from_response(status: u16, body: &[u8], retries: u32) -> Self {
        let mut message = None;
        let mut code = None;
        let mut errors = Vec::new();
        let mut raw_body = None;

        match serde_json::from_slice::<Value>(body) {
            Ok(json) => match json.get("error") {
                Some(Value::Object(error)) => {
                    message = error
                        .get("message")
                        .and_then(|m| m.as_str())
                        .map(str::to_string);
                    code = error.get("code").and_then(|c| c.as_i64());
                    if let Some(list) = error.get("errors").and_then(|e| e.as_array()) {
                        errors = list
                            .iter()
                            .map(|e| match e {
                                Value::String(s) => s.clone(),
                                other => other.to_string(),
                            })
                            .collect();
                    }
                }
                Some(Value::String(text)) => message = Some(text.clone()),
                _ => {
                    message = json
                        .get("message")
                        .and_then(|m| m.as_str())
                        .map(str::to_string);
                    if message.is_none() {
                        raw_body = Some(json.to_string());
                    }
                }
            },
            Err(_) => {
                let text = String::from_utf8_lossy(body).trim().to_string();
                if !text.is_empty() {
                    raw_body = Some(text);
                }
            }
        }

        Self {
            status: Some(status),
            kind: FailureKind::Api {
                message,
                code,
                errors,
                raw_body,
            },
            retries,
        }
    }

    /// Human-readable message combining status, API error detail and transport cause
    pub fn formatted(&self) -> String {
        let status_line = self.status.map(status_line);

        let detail = match &self.kind {
            FailureKind::Api {
                message,
                code,
                errors,
                raw_body,
            } => {
                let mut parts = Vec::new();
                if let Some(message) = message {
                    match code {
                        Some(code) => parts.push(format!("{} (code {})", message, code)),
                        None => parts.push(message.clone()),
                    }
                }
                if !errors.is_empty() {
                    parts.push(errors.join(", "));
                }
                if parts.is_empty() {
                    if let Some(raw) = raw_body {
                        parts.push(truncate(raw, MAX_RAW_BODY_IN_ERROR));
                    }
                }
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join(": "))
                }
            }
            FailureKind::RateLimited { message } => {
                let gave_up = format!(
                    "rate limited by the API, gave up after {} retries",
                    self.retries
                );
                Some(match message {
                    Some(message) => format!("{}: {}", gave_up, message),
                    None => gave_up,
                })
            }
            FailureKind::Transport(cause) => {
                Some(format!("no response received: {}", cause))
            }
            FailureKind::MalformedResponse(cause) => {
                Some(format!("malformed response body: {}", cause))
            }
        };

        match (status_line, detail) {
            (Some(status), Some(detail)) => format!("{}: {}", status, detail),
            (Some(status), None) => status,
            (None, Some(detail)) => detail,
            (None, None) => "request failed".to_string(),
        }
    }
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted())
    }
}

impl std::error::Error for ApiFailure {}

fn status_line(status: u16) -> String {
    match StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
    {
        Some(reason) => format!("{} {}", status, reason),
        None => status.to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

/// Outcome of executing one [`RequestSpec`](super::RequestSpec)
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResult {
    Success {
        status: u16,
        data: Value,
        retries: u32,
    },
    Failure(ApiFailure),
}

impl ApiResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ApiResult::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    /// HTTP status, absent for transport failures
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiResult::Success { status, .. } => Some(*status),
            ApiResult::Failure(failure) => failure.status,
        }
    }

    /// Rate-limit retries performed for this request
    pub fn retries(&self) -> u32 {
        match self {
            ApiResult::Success { retries, .. } => *retries,
            ApiResult::Failure(failure) => failure.retries,
        }
    }

    /// Parsed body of a successful response
    pub fn data(&self) -> Result<&Value, AccessError> {
        match self {
            ApiResult::Success { data, .. } => Ok(data),
            ApiResult::Failure(_) => Err(AccessError::DataOnFailure),
        }
    }

    /// Formatted error message of a failed request
    pub fn formatted_error(&self) -> Result<String, AccessError> {
        match self {
            ApiResult::Success { .. } => Err(AccessError::ErrorOnSuccess),
            ApiResult::Failure(failure) => Ok(failure.formatted()),
        }
    }

    pub fn failure(&self) -> Option<&ApiFailure> {
        match self {
            ApiResult::Success { .. } => None,
            ApiResult::Failure(failure) => Some(failure),
        }
    }

    /// Convert into a standard `Result`, for use with `?`
    pub fn into_result(self) -> Result<Value, ApiFailure> {
        match self {
            ApiResult::Success { data, .. } => Ok(data),
            ApiResult::Failure(failure) => Err(failure),
        }
    }
}

/// Results of a batch, index-aligned with the submitted specs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResult {
    results: Vec<ApiResult>,
}

impl BatchResult {
    pub fn new(results: Vec<ApiResult>) -> Self {
        Self { results }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn result_at(&self, index: usize) -> Option<&ApiResult> {
        self.results.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ApiResult> {
        self.results.iter()
    }

    /// Payloads of the successful requests, in input order
    pub fn successful_payloads(&self) -> Vec<&Value> {
        self.results
            .iter()
            .filter_map(|r| r.data().ok())
            .collect()
    }

    /// Input indices whose request failed, ascending
    pub fn failed_indices(&self) -> Vec<usize> {
        self.failures().map(|(i, _)| i).collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = (usize, &ApiFailure)> {
        self.results
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.failure().map(|f| (i, f)))
    }

    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.len() - self.success_count()
    }

    pub fn into_results(self) -> Vec<ApiResult> {
        self.results
    }
}

impl<'a> IntoIterator for &'a BatchResult {
    type Item = &'a ApiResult;
    type IntoIter = std::slice::Iter<'a, ApiResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

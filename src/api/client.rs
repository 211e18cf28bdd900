use super::auth::{Authenticator, Credential};
use super::error::EngineError;
use super::request::RequestSpec;
use super::resilience::{ApiLogger, ClientConfig, RetryPolicy};
use super::result::{ApiFailure, ApiResult};
use super::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
use log::debug;
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

use super::constants::headers;

/// PagerDuty REST API client: the request executor every command funnels through.
///
/// Cheap to clone; clones share the credential, the transport and its
/// connection pool. Nothing in the client is mutated by a request.
#[derive(Clone)]
pub struct PagerDutyClient {
    base_url: Url,
    authenticator: Authenticator,
    transport: Arc<dyn HttpTransport>,
    retry_policy: RetryPolicy,
    api_logger: ApiLogger,
    config: ClientConfig,
}

impl PagerDutyClient {
    /// Create a client using the default reqwest transport
    pub fn new(credential: Option<Credential>, config: ClientConfig) -> Result<Self, EngineError> {
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(credential, config, Arc::new(transport))
    }

    /// Create a client over a custom transport
    pub fn with_transport(
        credential: Option<Credential>,
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, EngineError> {
        let authenticator = Authenticator::new(credential)?;

        let base_url = Url::parse(&config.base_url).map_err(|e| {
            EngineError::InvalidRequest(format!("invalid base URL '{}': {}", config.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(EngineError::InvalidRequest(format!(
                "base URL '{}' cannot carry a path",
                config.base_url
            )));
        }

        Ok(Self {
            base_url,
            authenticator,
            transport,
            retry_policy: RetryPolicy::new(config.retry.clone()),
            api_logger: ApiLogger::new(config.monitoring.clone()),
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn credential(&self) -> &Credential {
        self.authenticator.credential()
    }

    pub(crate) fn api_logger(&self) -> &ApiLogger {
        &self.api_logger
    }

    /// Execute one request.
    ///
    /// Every network or API condition resolves to an [`ApiResult`]; throttled
    /// responses are retried within the configured budget.
    pub async fn execute(&self, spec: &RequestSpec) -> ApiResult {
        let context = self
            .api_logger
            .start_operation(spec.method().as_str(), spec.endpoint());
        let request = self.prepare(spec);
        let mut retries: u32 = 0;

        let result = loop {
            self.api_logger
                .log_request(&context, request.url.as_str(), &request.headers, retries + 1);
            let started = Instant::now();

            let response = match self.transport.send(request.clone()).await {
                Ok(response) => response,
                Err(error) => {
                    debug!("{} {} failed without a response: {}", context.method, context.endpoint, error);
                    break ApiResult::Failure(ApiFailure::transport(error.to_string(), retries));
                }
            };
            self.api_logger
                .log_response(&context, response.status, started.elapsed());

            if response.status == StatusCode::TOO_MANY_REQUESTS.as_u16() {
                if self.retry_policy.should_retry(response.status, retries) {
                    retries += 1;
                    let delay = self.retry_policy.delay_for(retries, &response.headers);
                    self.api_logger.log_retry(&context, retries, delay);
                    tokio::time::sleep(delay).await;
                    continue;
                }
                break ApiResult::Failure(ApiFailure::rate_limited(&response.body, retries));
            }

            break interpret_response(response, retries);
        };

        self.api_logger.complete_operation(&context, &result);
        result
    }

    /// Resolve the URL and merge shared headers with the spec's own
    fn prepare(&self, spec: &RequestSpec) -> HttpRequest {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            segments.extend(spec.endpoint().split('/').filter(|s| !s.is_empty()));
        }

        let pairs = spec.query_pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }

        let mut request_headers = self.authenticator.headers().clone();
        if spec.body_bytes().is_some() {
            request_headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_static(headers::CONTENT_TYPE_JSON),
            );
        }
        for (name, value) in spec.headers() {
            request_headers.insert(name.clone(), value.clone());
        }

        HttpRequest {
            method: spec.method().clone(),
            url,
            headers: request_headers,
            body: spec.body_bytes().map(<[u8]>::to_vec),
        }
    }
}

/// Turn a final (non-throttled) response into a result
fn interpret_response(response: HttpResponse, retries: u32) -> ApiResult {
    let status = response.status;

    if !(200..300).contains(&status) {
        return ApiResult::Failure(ApiFailure::from_response(status, &response.body, retries));
    }

    // 204 and friends carry no body
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return ApiResult::Success {
            status,
            data: Value::Null,
            retries,
        };
    }

    match serde_json::from_slice::<Value>(&response.body) {
        Ok(data) => ApiResult::Success {
            status,
            data,
            retries,
        },
        Err(e) => ApiResult::Failure(ApiFailure::malformed(status, e.to_string(), retries)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{AUTHORIZATION, HeaderMap};
    use serde_json::json;

    fn client() -> PagerDutyClient {
        let config = ClientConfig::builder()
            .base_url("https://api.example.test/base/")
            .build();
        PagerDutyClient::new(Some(Credential::Bearer("abc".to_string())), config).unwrap()
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HeaderMap::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_construction_requires_credential() {
        let result = PagerDutyClient::new(None, ClientConfig::default());
        assert!(matches!(result, Err(EngineError::NoCredential)));
    }

    #[test]
    fn test_invalid_base_url() {
        let config = ClientConfig::builder().base_url("not a url").build();
        let result = PagerDutyClient::new(Some(Credential::Bearer("abc".to_string())), config);
        assert!(matches!(result, Err(EngineError::InvalidRequest(_))));
    }

    #[test]
    fn test_prepare_merges_headers_and_params() {
        let spec = RequestSpec::put("incidents/Q1ABCDEF", json!({"incident": {}}))
            .param("include", vec!["priorities"])
            .header("From", "ops@example.com")
            .build()
            .unwrap();

        let request = client().prepare(&spec);

        assert_eq!(
            request.url.as_str(),
            "https://api.example.test/base/incidents/Q1ABCDEF?include%5B%5D=priorities"
        );
        assert_eq!(request.headers.get(AUTHORIZATION).unwrap(), "Bearer abc");
        assert_eq!(request.headers.get("from").unwrap(), "ops@example.com");
        assert_eq!(request.headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(request.body.as_deref(), Some(br#"{"incident":{}}"#.as_slice()));
    }

    #[test]
    fn test_spec_headers_override_shared_ones() {
        let spec = RequestSpec::get("users/me")
            .header("Accept", "application/json")
            .build()
            .unwrap();

        let request = client().prepare(&spec);
        assert_eq!(request.headers.get("accept").unwrap(), "application/json");
    }

    #[test]
    fn test_interpret_success_and_empty_body() {
        let ok = interpret_response(response(200, r#"{"teams": []}"#), 0);
        assert_eq!(ok.data().unwrap(), &json!({"teams": []}));

        let no_content = interpret_response(response(204, ""), 0);
        assert_eq!(no_content.data().unwrap(), &Value::Null);
        assert_eq!(no_content.status(), Some(204));
    }

    #[test]
    fn test_interpret_malformed_success() {
        let result = interpret_response(response(200, "<html>"), 1);
        assert!(result.is_failure());
        assert_eq!(result.status(), Some(200));
        assert_eq!(result.retries(), 1);
        assert!(result.formatted_error().unwrap().contains("malformed response body"));
    }

    #[test]
    fn test_interpret_api_error() {
        let result = interpret_response(
            response(404, r#"{"error":{"message":"Not Found","code":2100}}"#),
            0,
        );
        assert_eq!(
            result.formatted_error().unwrap(),
            "404 Not Found: Not Found (code 2100)"
        );
    }
}

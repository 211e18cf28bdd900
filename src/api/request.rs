//! Request specifications: the unit of work submitted to the engine

use super::error::EngineError;
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::collections::BTreeMap;

/// A query parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    One(String),
    /// Encoded as repeated `key[]=value` pairs
    Many(Vec<String>),
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::One(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::One(value)
    }
}

impl From<&String> for QueryValue {
    fn from(value: &String) -> Self {
        QueryValue::One(value.clone())
    }
}

impl From<usize> for QueryValue {
    fn from(value: usize) -> Self {
        QueryValue::One(value.to_string())
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(values: Vec<String>) -> Self {
        QueryValue::Many(values)
    }
}

impl From<Vec<&str>> for QueryValue {
    fn from(values: Vec<&str>) -> Self {
        QueryValue::Many(values.into_iter().map(str::to_string).collect())
    }
}

/// Query parameters keyed by name
pub type QueryParams = BTreeMap<String, QueryValue>;

/// Immutable description of one HTTP call.
///
/// Built through [`RequestSpecBuilder`], which is where malformed input
/// (empty endpoint, body on a GET, bad header) is rejected.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    endpoint: String,
    method: Method,
    params: QueryParams,
    body: Option<Value>,
    body_bytes: Option<Vec<u8>>,
    headers: HeaderMap,
}

impl RequestSpec {
    pub fn builder(method: Method, endpoint: impl Into<String>) -> RequestSpecBuilder {
        RequestSpecBuilder::new(method, endpoint)
    }

    pub fn get(endpoint: impl Into<String>) -> RequestSpecBuilder {
        Self::builder(Method::GET, endpoint)
    }

    pub fn post(endpoint: impl Into<String>, body: Value) -> RequestSpecBuilder {
        Self::builder(Method::POST, endpoint).body(body)
    }

    pub fn put(endpoint: impl Into<String>, body: Value) -> RequestSpecBuilder {
        Self::builder(Method::PUT, endpoint).body(body)
    }

    pub fn delete(endpoint: impl Into<String>) -> RequestSpecBuilder {
        Self::builder(Method::DELETE, endpoint)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The body as sent on the wire
    pub fn body_bytes(&self) -> Option<&[u8]> {
        self.body_bytes.as_deref()
    }

    /// A copy of this spec with one query parameter replaced
    pub fn with_param(&self, key: &str, value: impl Into<QueryValue>) -> Self {
        let mut next = self.clone();
        next.params.insert(key.to_string(), value.into());
        next
    }

    /// Flatten the parameters into wire pairs, expanding arrays
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (key, value) in &self.params {
            match value {
                QueryValue::One(v) => pairs.push((key.clone(), v.clone())),
                QueryValue::Many(values) => {
                    let key = if key.ends_with("[]") {
                        key.clone()
                    } else {
                        format!("{}[]", key)
                    };
                    for v in values {
                        pairs.push((key.clone(), v.clone()));
                    }
                }
            }
        }
        pairs
    }
}

/// Builder for [`RequestSpec`]
#[derive(Debug, Clone)]
pub struct RequestSpecBuilder {
    endpoint: String,
    method: Method,
    params: QueryParams,
    body: Option<Value>,
    headers: Vec<(String, String)>,
}

impl RequestSpecBuilder {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            params: QueryParams::new(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn params(mut self, params: QueryParams) -> Self {
        self.params.extend(params);
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn build(self) -> Result<RequestSpec, EngineError> {
        let endpoint = self.endpoint.trim().trim_matches('/').to_string();
        if endpoint.is_empty() {
            return Err(EngineError::InvalidRequest("endpoint is empty".to_string()));
        }
        if endpoint.contains("://") {
            return Err(EngineError::InvalidRequest(format!(
                "endpoint must be a path relative to the API, got '{}'",
                endpoint
            )));
        }
        if endpoint.chars().any(char::is_whitespace) {
            return Err(EngineError::InvalidRequest(format!(
                "endpoint contains whitespace: '{}'",
                endpoint
            )));
        }

        if self.body.is_some() && (self.method == Method::GET || self.method == Method::HEAD) {
            return Err(EngineError::InvalidRequest(format!(
                "{} requests cannot carry a body",
                self.method
            )));
        }

        let mut headers = HeaderMap::new();
        for (name, value) in self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                EngineError::InvalidRequest(format!("invalid header name '{}'", name))
            })?;
            let header_value = HeaderValue::from_str(&value).map_err(|_| {
                EngineError::InvalidRequest(format!("invalid value for header '{}'", name))
            })?;
            headers.insert(header_name, header_value);
        }

        let body_bytes = match &self.body {
            Some(body) => Some(serde_json::to_vec(body).map_err(|e| {
                EngineError::InvalidRequest(format!("body cannot be serialized: {}", e))
            })?),
            None => None,
        };

        Ok(RequestSpec {
            endpoint,
            method: self.method,
            params: self.params,
            body: self.body,
            body_bytes,
            headers,
        })
    }
}

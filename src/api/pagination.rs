//! Paginated collection fetches
//!
//! Pages are requested strictly one after another since each page's position
//! depends on the previous response. Offset pagination (`limit`/`offset`/`more`)
//! is the default; a page carrying `next_cursor` switches to cursor mode.

use super::client::PagerDutyClient;
use super::constants::pagination;
use super::error::EngineError;
use super::request::{QueryParams, QueryValue, RequestSpec};
use super::result::{ApiFailure, ApiResult};
use log::debug;
use serde_json::Value;
use std::time::Instant;

/// Options for [`PagerDutyClient::fetch`]
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub params: QueryParams,
    pub headers: Vec<(String, String)>,
    /// Stop once this many items were collected
    pub limit: Option<usize>,
    /// Defaults to the client's configured page size
    pub page_size: Option<usize>,
    /// Name of the items array when it differs from the endpoint's last segment
    pub items_key: Option<String>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn params(mut self, params: QueryParams) -> Self {
        self.params.extend(params);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn items_key(mut self, key: impl Into<String>) -> Self {
        self.items_key = Some(key.into());
        self
    }
}

/// Position of the next page to request
#[derive(Debug, Clone, PartialEq)]
enum PageCursor {
    Offset(usize),
    Cursor(String),
}

impl PageCursor {
    /// Where the page after `page` starts, or `None` when `page` was the last
    fn advance(&self, page: &Value, received: usize) -> Option<PageCursor> {
        if received == 0 {
            return None;
        }

        if let Some(next) = page.get(pagination::NEXT_CURSOR) {
            return match next {
                Value::String(token) if !token.is_empty() => Some(PageCursor::Cursor(token.clone())),
                _ => None,
            };
        }

        match (self, page.get(pagination::MORE).and_then(Value::as_bool)) {
            (PageCursor::Offset(offset), Some(true)) => Some(PageCursor::Offset(offset + received)),
            _ => None,
        }
    }

    fn apply(&self, spec: &RequestSpec) -> RequestSpec {
        match self {
            PageCursor::Offset(offset) => spec.with_param(pagination::OFFSET, *offset),
            PageCursor::Cursor(token) => spec.with_param(pagination::CURSOR, token),
        }
    }
}

impl PagerDutyClient {
    /// Fetch every item of a collection, in page order.
    ///
    /// Fails with [`EngineError::Request`] on the first failed page; items
    /// already collected are dropped.
    pub async fn fetch_all(
        &self,
        endpoint: &str,
        params: QueryParams,
        limit: Option<usize>,
    ) -> Result<Vec<Value>, EngineError> {
        self.fetch(endpoint, FetchOptions::new().params(params).limit(limit))
            .await
    }

    /// Fetch a collection with full control over headers, page size and items key
    pub async fn fetch(
        &self,
        endpoint: &str,
        options: FetchOptions,
    ) -> Result<Vec<Value>, EngineError> {
        if options.limit == Some(0) {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let page_size = options
            .page_size
            .unwrap_or(self.config().page_size)
            .clamp(1, 100);

        let base = RequestSpec::get(endpoint)
            .params(options.params)
            .param(pagination::LIMIT, page_size)
            .headers(options.headers)
            .build()?;

        let items_key = options
            .items_key
            .unwrap_or_else(|| default_items_key(base.endpoint()));

        let mut items: Vec<Value> = Vec::new();
        let mut pages = 0usize;
        let mut cursor = PageCursor::Offset(0);

        loop {
            let (status, page, retries) = match self.execute(&cursor.apply(&base)).await {
                ApiResult::Success {
                    status,
                    data,
                    retries,
                } => (status, data, retries),
                ApiResult::Failure(failure) => {
                    debug!(
                        "Pagination of {} stopped at page {}: {}",
                        base.endpoint(),
                        pages + 1,
                        failure
                    );
                    return Err(EngineError::Request(failure));
                }
            };
            pages += 1;

            let page_items = page_items(&page, &items_key).ok_or_else(|| {
                EngineError::Request(ApiFailure::malformed(
                    status,
                    format!("page has no '{}' array", items_key),
                    retries,
                ))
            })?;
            let received = page_items.len();

            let take = match options.limit {
                Some(limit) => received.min(limit - items.len()),
                None => received,
            };
            items.extend(page_items.iter().take(take).cloned());

            if options.limit.is_some_and(|limit| items.len() >= limit) {
                break;
            }

            match cursor.advance(&page, received) {
                Some(next) => cursor = next,
                None => break,
            }
        }

        self.api_logger()
            .log_pagination(base.endpoint(), pages, items.len(), started.elapsed());

        Ok(items)
    }
}

/// `teams` for `teams`, `members` for `teams/PABC123/members`
fn default_items_key(endpoint: &str) -> String {
    endpoint
        .rsplit('/')
        .next()
        .unwrap_or(endpoint)
        .to_string()
}

/// The items array of a page: the named field, else the page's only array
fn page_items<'a>(page: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    if let Some(items) = page.get(key).and_then(Value::as_array) {
        return Some(items);
    }

    let object = page.as_object()?;
    let mut arrays = object.values().filter_map(Value::as_array);
    match (arrays.next(), arrays.next()) {
        (Some(only), None) => Some(only),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_items_key() {
        assert_eq!(default_items_key("teams"), "teams");
        assert_eq!(default_items_key("teams/PABC123/members"), "members");
    }

    #[test]
    fn test_page_items_prefers_named_array() {
        let page = json!({"teams": [{"id": "1"}], "tags": []});
        assert_eq!(page_items(&page, "teams").unwrap().len(), 1);
    }

    #[test]
    fn test_page_items_falls_back_to_only_array() {
        let page = json!({"orchestrations": [{"id": "1"}, {"id": "2"}], "more": false});
        assert_eq!(page_items(&page, "event_orchestrations").unwrap().len(), 2);

        let ambiguous = json!({"a": [], "b": []});
        assert!(page_items(&ambiguous, "c").is_none());
        assert!(page_items(&json!({"more": false}), "teams").is_none());
    }

    #[test]
    fn test_offset_advances_by_items_received() {
        let cursor = PageCursor::Offset(25);
        let page = json!({"more": true});
        assert_eq!(cursor.advance(&page, 10), Some(PageCursor::Offset(35)));
    }

    #[test]
    fn test_last_page_detection() {
        let cursor = PageCursor::Offset(0);
        assert_eq!(cursor.advance(&json!({"more": false}), 25), None);
        assert_eq!(cursor.advance(&json!({}), 25), None);
        assert_eq!(cursor.advance(&json!({"more": true}), 0), None);
    }

    #[test]
    fn test_cursor_mode() {
        let cursor = PageCursor::Offset(0);
        let page = json!({"next_cursor": "abc"});
        assert_eq!(
            cursor.advance(&page, 25),
            Some(PageCursor::Cursor("abc".to_string()))
        );

        let last = json!({"next_cursor": null});
        assert_eq!(PageCursor::Cursor("abc".to_string()).advance(&last, 3), None);
    }
}

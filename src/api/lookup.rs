//! Name and email lookups built on the paginator
//!
//! The API's `query` filter matches loosely, so candidates are re-checked for
//! an exact match before an ID is returned.

use super::client::PagerDutyClient;
use super::error::EngineError;
use super::request::{QueryParams, RequestSpec};
use serde_json::Value;
use std::collections::BTreeMap;

impl PagerDutyClient {
    /// ID of the first item in `collection` whose `field` equals `value` exactly
    pub async fn find_id_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<String>, EngineError> {
        let mut params = QueryParams::new();
        params.insert("query".to_string(), value.into());

        let candidates = self.fetch_all(collection, params, None).await?;
        let id = candidates
            .iter()
            .find(|item| item.get(field).and_then(Value::as_str) == Some(value))
            .and_then(|item| item.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string);

        log::debug!(
            "Lookup of {} '{}' in {} among {} candidates: {:?}",
            field,
            value,
            collection,
            candidates.len(),
            id
        );
        Ok(id)
    }

    /// ID of the item named exactly `name`; `Ok(None)` when there is none
    pub async fn find_id_by_name(
        &self,
        collection: &str,
        name: &str,
    ) -> Result<Option<String>, EngineError> {
        self.find_id_by_field(collection, "name", name).await
    }

    /// ID of the user with exactly this email
    pub async fn find_id_by_email(&self, email: &str) -> Result<Option<String>, EngineError> {
        self.find_id_by_field("users", "email", email).await
    }

    pub async fn escalation_policy_id_for_name(
        &self,
        name: &str,
    ) -> Result<Option<String>, EngineError> {
        self.find_id_by_name("escalation_policies", name).await
    }

    pub async fn schedule_id_for_name(&self, name: &str) -> Result<Option<String>, EngineError> {
        self.find_id_by_name("schedules", name).await
    }

    pub async fn team_id_for_name(&self, name: &str) -> Result<Option<String>, EngineError> {
        self.find_id_by_name("teams", name).await
    }

    pub async fn user_id_for_email(&self, email: &str) -> Result<Option<String>, EngineError> {
        self.find_id_by_email(email).await
    }

    /// Account priorities keyed by name
    pub async fn priorities_by_name(&self) -> Result<BTreeMap<String, Value>, EngineError> {
        let priorities = self.fetch_all("priorities", QueryParams::new(), None).await?;

        Ok(priorities
            .into_iter()
            .filter_map(|priority| {
                let name = priority.get("name").and_then(Value::as_str)?.to_string();
                Some((name, priority))
            })
            .collect())
    }

    /// The user behind the current credential.
    ///
    /// Legacy API keys belong to the account rather than a user, so they
    /// yield `Ok(None)` without a request.
    pub async fn me(&self) -> Result<Option<Value>, EngineError> {
        if self.credential().is_legacy() {
            return Ok(None);
        }

        let spec = RequestSpec::get("users/me").build()?;
        let data = self.execute(&spec).await.into_result()?;
        Ok(data.get("user").cloned())
    }
}

pub mod auth;
pub mod ep;
pub mod field;
pub mod incident;
pub mod orchestration;
pub mod rest;
pub mod schedule;
pub mod team;

use crate::api::{BatchResult, EngineError, PagerDutyClient};
use crate::config::Config;
use crate::utils;
use anyhow::{Context, Result};
use colored::*;
use log::info;

/// Build an engine client from the stored configuration
pub fn build_client(config: &Config, alias: Option<&str>) -> Result<PagerDutyClient> {
    let credential = config.current_credential(alias)?;
    let client_config = config.client_config();
    info!("Using PagerDuty API at {}", client_config.base_url);

    PagerDutyClient::new(credential, client_config).context("Failed to create PagerDuty client")
}

/// Print one line per failed request, labelled by `describe(index)`
pub fn report_failures<F>(batch: &BatchResult, describe: F) -> usize
where
    F: Fn(usize) -> String,
{
    let mut failed = 0;
    for (index, failure) in batch.failures() {
        failed += 1;
        eprintln!("{} {}", describe(index).red().bold(), failure);
    }
    failed
}

/// Print the outcome line shared by the batch commands
pub fn print_batch_summary(action: &str, batch: &BatchResult) {
    let line = format!(
        "{}: {} succeeded, {} failed",
        action,
        batch.success_count(),
        batch.failure_count()
    );
    if batch.failure_count() == 0 {
        println!("{}", line.green());
    } else {
        println!("{}", line.yellow());
    }
}

/// Flatten ID arguments and reject anything that is not a PagerDuty ID
pub fn parse_ids(values: &[String], what: &str) -> Result<Vec<String>> {
    let ids = utils::split_dedup_and_flatten(values);
    let invalid = utils::invalid_pagerduty_ids(&ids);
    if !invalid.is_empty() {
        anyhow::bail!("Invalid {} IDs: {}", what, invalid.join(", "));
    }
    Ok(ids)
}

/// Resolve each name to an ID, failing on the first one that does not exist
pub async fn resolve_names<'a, F, Fut>(names: &'a [String], what: &str, lookup: F) -> Result<Vec<String>>
where
    F: Fn(&'a str) -> Fut,
    Fut: std::future::Future<Output = Result<Option<String>, EngineError>>,
{
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        let id = lookup(name.as_str())
            .await
            .with_context(|| format!("Failed to look up {} '{}'", what, name))?
            .with_context(|| format!("No {} was found matching '{}'", what, name))?;
        ids.push(id);
    }
    Ok(ids)
}

/// Take `id` as given, or look up the object called `name`
pub async fn resolve_id<'a, F, Fut>(
    id: Option<String>,
    name: Option<&'a str>,
    what: &str,
    lookup: F,
) -> Result<String>
where
    F: FnOnce(&'a str) -> Fut,
    Fut: std::future::Future<Output = Result<Option<String>, EngineError>>,
{
    match (id, name) {
        (Some(id), _) => parse_ids(&[id], what)?
            .pop()
            .with_context(|| format!("No {} specified", what)),
        (None, Some(name)) => lookup(name)
            .await
            .with_context(|| format!("Failed to look up {} '{}'", what, name))?
            .with_context(|| format!("No {} was found with the name '{}'", what, name)),
        (None, None) => anyhow::bail!("Specify one of --id or --name"),
    }
}

/// Print rows under a bold header, each column padded to its widest cell
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!("{:<w$}", h, w = *w))
        .collect::<Vec<_>>()
        .join("  ");
    println!("{}", header.trim_end().bold());

    for row in rows {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:<w$}", cell, w = *w))
            .collect::<Vec<_>>()
            .join("  ");
        println!("{}", line.trim_end());
    }
}

/// String field of a JSON object, or an empty string
pub fn text(value: &serde_json::Value, key: &str) -> String {
    value
        .get(key)
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Append `extra` to `ids`, keeping first occurrences only
pub fn merge_unique(mut ids: Vec<String>, extra: Vec<String>) -> Vec<String> {
    for id in extra {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

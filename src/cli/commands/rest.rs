//! Raw REST access through the engine

use crate::api::{FetchOptions, QueryParams, QueryValue, RequestSpec};
use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use reqwest::Method;
use serde_json::Value;

#[derive(Args)]
pub struct RestArgs {
    /// Endpoint relative to the API root, e.g. `teams` or `incidents/Q1ABCDEF`
    pub endpoint: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Query parameter as key=value; repeat a key to send an array
    #[arg(short = 'P', long = "param")]
    pub params: Vec<String>,

    /// Extra header as Name:Value
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// JSON request body
    #[arg(short, long)]
    pub data: Option<String>,

    /// Fetch every page of a collection
    #[arg(long)]
    pub paginate: bool,

    /// Stop paginating after this many items
    #[arg(long, requires = "paginate")]
    pub limit: Option<usize>,

    /// Name of the items array when it differs from the endpoint name
    #[arg(long, requires = "paginate")]
    pub items_key: Option<String>,
}

pub async fn rest_command(args: RestArgs, alias: Option<&str>) -> Result<()> {
    let config = Config::load()?;
    let client = super::build_client(&config, alias)?;

    let params = parse_params(&args.params)?;
    let headers = parse_headers(&args.headers)?;

    if args.paginate {
        let mut options = FetchOptions::new().params(params).limit(args.limit);
        for (name, value) in headers {
            options = options.header(name, value);
        }
        if let Some(key) = args.items_key {
            options = options.items_key(key);
        }

        let items = client.fetch(&args.endpoint, options).await?;
        println!("{}", serde_json::to_string_pretty(&Value::Array(items))?);
        return Ok(());
    }

    let method = Method::from_bytes(args.method.to_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method '{}'", args.method))?;

    let mut builder = RequestSpec::builder(method, &args.endpoint)
        .params(params)
        .headers(headers);
    if let Some(data) = &args.data {
        let body: Value = serde_json::from_str(data).context("--data is not valid JSON")?;
        builder = builder.body(body);
    }
    let spec = builder.build()?;

    let data = client.execute(&spec).await.into_result()?;
    if !data.is_null() {
        println!("{}", serde_json::to_string_pretty(&data)?);
    }
    Ok(())
}

/// `key=value` pairs; a repeated key collects into an array
fn parse_params(raw: &[String]) -> Result<QueryParams> {
    let mut params = QueryParams::new();
    for pair in raw {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("Parameter '{}' is not in key=value form", pair))?;
        let key = key.trim().to_string();
        let value = value.to_string();

        let merged = match params.remove(&key) {
            None => QueryValue::One(value),
            Some(QueryValue::One(first)) => QueryValue::Many(vec![first, value]),
            Some(QueryValue::Many(mut values)) => {
                values.push(value);
                QueryValue::Many(values)
            }
        };
        params.insert(key, merged);
    }
    Ok(params)
}

fn parse_headers(raw: &[String]) -> Result<Vec<(String, String)>> {
    raw.iter()
        .map(|header| {
            let (name, value) = header
                .split_once(':')
                .with_context(|| format!("Header '{}' is not in Name:Value form", header))?;
            Ok((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

//! Custom field commands
//!
//! The fields API is behind the flex-service early access header.

use super::{build_client, parse_ids, print_table, text};
use crate::api::constants::headers::EARLY_ACCESS;
use crate::api::{FetchOptions, RequestSpec};
use crate::config::Config;
use anyhow::{Context, Result};
use clap::{Args, Subcommand, ValueEnum};
use colored::*;
use serde_json::{Map, Value, json};
use std::collections::HashMap;

const FLEX_SERVICE: &str = "flex-service-early-access";

#[derive(Args)]
pub struct FieldCommands {
    #[command(subcommand)]
    pub command: FieldSubcommands,
}

#[derive(Subcommand)]
pub enum FieldSubcommands {
    /// List custom fields, or the fields configured in one schema
    List {
        /// Only show the fields of this schema
        #[arg(short, long)]
        schema_id: Option<String>,
        /// Stop after this many items
        #[arg(short, long)]
        limit: Option<usize>,
        /// Print the full objects as JSON
        #[arg(short, long)]
        json: bool,
    },
    /// Create a custom field
    Create {
        /// Logical grouping the field belongs to
        #[arg(short = 's', long, default_value = "incidents")]
        namespace: String,
        /// Identifier used by scripts
        #[arg(short, long)]
        name: String,
        /// Human readable name
        #[arg(short = 'N', long)]
        display_name: String,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short = 't', long = "type", value_enum, default_value_t = FieldType::String)]
        datatype: FieldType,
        /// The field holds a list of values
        #[arg(short, long)]
        multi: bool,
        /// The field only takes values from a fixed list
        #[arg(short, long)]
        fixed: bool,
        /// Print only the new field's ID
        #[arg(short, long)]
        pipe: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    Datetime,
    Url,
}

impl FieldType {
    fn as_str(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Datetime => "datetime",
            FieldType::Url => "url",
        }
    }
}

pub async fn field_command(args: FieldCommands, alias: Option<&str>) -> Result<()> {
    let config = Config::load()?;
    let client = build_client(&config, alias)?;

    match args.command {
        FieldSubcommands::List {
            schema_id,
            limit,
            json,
        } => {
            let fields = client
                .fetch(
                    "fields",
                    FetchOptions::new().header(EARLY_ACCESS, FLEX_SERVICE).limit(limit),
                )
                .await
                .context("Couldn't get fields")?;

            let Some(schema_id) = schema_id else {
                if json {
                    println!("{}", serde_json::to_string_pretty(&fields)?);
                } else {
                    print_table(&["ID", "Namespace", "Name", "Type", "Multi", "Fixed"], &field_rows(&fields));
                }
                return Ok(());
            };

            let schema_id = parse_ids(&[schema_id], "schema")?
                .pop()
                .context("No schema specified")?;
            let configurations = client
                .fetch(
                    &format!("field_schemas/{}/field_configurations", schema_id),
                    FetchOptions::new().header(EARLY_ACCESS, FLEX_SERVICE).limit(limit),
                )
                .await
                .with_context(|| format!("Couldn't get the fields of schema {}", schema_id))?;
            if configurations.is_empty() {
                anyhow::bail!("Schema {} has no fields", schema_id);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&configurations)?);
            } else {
                print_table(
                    &["ID", "Field ID", "Namespace", "Name", "Type", "Required", "Default"],
                    &configuration_rows(&configurations, &fields),
                );
            }
            Ok(())
        }
        FieldSubcommands::Create {
            namespace,
            name,
            display_name,
            description,
            datatype,
            multi,
            fixed,
            pipe,
        } => {
            let body = field_body(&namespace, &name, &display_name, description.as_deref(), datatype, multi, fixed);
            let spec = RequestSpec::post("fields", body)
                .header(EARLY_ACCESS, FLEX_SERVICE)
                .build()?;
            let created = client
                .execute(&spec)
                .await
                .into_result()
                .context("Failed to create field")?;

            let field = &created["field"];
            if pipe {
                println!("{}", text(field, "id"));
            } else {
                println!(
                    "Created field {} ({})",
                    text(field, "name").bold().blue(),
                    text(field, "id").bold().blue()
                );
            }
            Ok(())
        }
    }
}

fn field_body(
    namespace: &str,
    name: &str,
    display_name: &str,
    description: Option<&str>,
    datatype: FieldType,
    multi: bool,
    fixed: bool,
) -> Value {
    let mut field = Map::new();
    field.insert("namespace".to_string(), json!(namespace));
    field.insert("name".to_string(), json!(name));
    field.insert("display_name".to_string(), json!(display_name));
    if let Some(description) = description {
        field.insert("description".to_string(), json!(description));
    }
    field.insert("datatype".to_string(), json!(datatype.as_str()));
    field.insert("multi_value".to_string(), json!(multi));
    field.insert("fixed_options".to_string(), json!(fixed));
    json!({ "field": field })
}

fn field_rows(fields: &[Value]) -> Vec<Vec<String>> {
    fields
        .iter()
        .map(|field| {
            vec![
                text(field, "id"),
                text(field, "namespace"),
                text(field, "name"),
                text(field, "datatype"),
                flag(field, "multi_value"),
                flag(field, "fixed_options"),
            ]
        })
        .collect()
}

/// Schema configurations joined with the field they configure
fn configuration_rows(configurations: &[Value], fields: &[Value]) -> Vec<Vec<String>> {
    let by_id: HashMap<String, &Value> = fields
        .iter()
        .map(|field| (text(field, "id"), field))
        .collect();

    configurations
        .iter()
        .map(|configuration| {
            let field_id = text(&configuration["field"], "id");
            let field = by_id.get(&field_id).copied().unwrap_or(&Value::Null);
            let default = match &configuration["default_value"]["value"] {
                Value::Null => String::new(),
                Value::String(value) => value.clone(),
                other => other.to_string(),
            };
            vec![
                text(configuration, "id"),
                field_id,
                text(field, "namespace"),
                text(field, "name"),
                text(field, "datatype"),
                flag(configuration, "required"),
                default,
            ]
        })
        .collect()
}

fn flag(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_bool)
        .map(|b| b.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_body_omits_missing_description() {
        let body = field_body("incidents", "region", "Region", None, FieldType::String, false, true);
        assert_eq!(
            body,
            json!({"field": {
                "namespace": "incidents",
                "name": "region",
                "display_name": "Region",
                "datatype": "string",
                "multi_value": false,
                "fixed_options": true
            }})
        );

        let described = field_body("incidents", "cost", "Cost", Some("In EUR"), FieldType::Float, false, false);
        assert_eq!(described["field"]["description"], "In EUR");
        assert_eq!(described["field"]["datatype"], "float");
    }

    #[test]
    fn test_configuration_rows_join_fields() {
        let fields = vec![json!({
            "id": "PFIELD1", "namespace": "incidents", "name": "region", "datatype": "string"
        })];
        let configurations = vec![
            json!({
                "id": "PCONF01",
                "field": {"id": "PFIELD1"},
                "required": true,
                "default_value": {"value": "emea"}
            }),
            json!({"id": "PCONF02", "field": {"id": "PGONE01"}, "required": false}),
        ];

        let rows = configuration_rows(&configurations, &fields);
        assert_eq!(rows[0], vec!["PCONF01", "PFIELD1", "incidents", "region", "string", "true", "emea"]);
        assert_eq!(rows[1], vec!["PCONF02", "PGONE01", "", "", "", "false", ""]);
    }
}

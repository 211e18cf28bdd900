//! Event orchestration commands

use super::{build_client, print_table, report_failures, text};
use crate::api::{FetchOptions, QueryParams, RequestSpec};
use crate::config::Config;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::*;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Args)]
pub struct OrchestrationCommands {
    #[command(subcommand)]
    pub command: OrchestrationSubcommands,
}

#[derive(Subcommand)]
pub enum OrchestrationSubcommands {
    /// List global event orchestrations with their routing keys
    List {
        /// Print the full orchestration objects as JSON
        #[arg(short, long, conflicts_with = "pipe")]
        json: bool,
        /// Print orchestration IDs only
        #[arg(short, long)]
        pipe: bool,
        /// Separator between multiple routing keys
        #[arg(short, long, default_value = ", ")]
        delimiter: String,
    },
}

pub async fn orchestration_command(args: OrchestrationCommands, alias: Option<&str>) -> Result<()> {
    match args.command {
        OrchestrationSubcommands::List {
            json,
            pipe,
            delimiter,
        } => list(alias, json, pipe, &delimiter).await,
    }
}

async fn list(alias: Option<&str>, json: bool, pipe: bool, delimiter: &str) -> Result<()> {
    let config = Config::load()?;
    let client = build_client(&config, alias)?;

    let teams: HashMap<String, String> = client
        .fetch_all("teams", QueryParams::new(), None)
        .await
        .context("Couldn't get teams")?
        .iter()
        .map(|team| (text(team, "id"), text(team, "summary")))
        .collect();

    let mut orchestrations = client
        .fetch(
            "event_orchestrations",
            FetchOptions::new().items_key("orchestrations"),
        )
        .await
        .context("Couldn't get event orchestrations")?;
    if orchestrations.is_empty() {
        println!("{}", "No global orchestrations found".yellow());
        return Ok(());
    }

    // Integrations (and their routing keys) only come with the full object
    let specs = orchestrations
        .iter()
        .map(|o| RequestSpec::get(format!("event_orchestrations/{}", text(o, "id"))).build())
        .collect::<Result<Vec<_>, _>>()?;
    let details = client.run_batch_default(&specs).await?;
    report_failures(&details, |i| {
        format!("Failed to get orchestration {}:", text(&orchestrations[i], "id"))
    });
    for (orchestration, result) in orchestrations.iter_mut().zip(details.iter()) {
        if let Ok(detail) = result.data() {
            if let (Some(integrations), Some(fields)) = (
                detail["orchestration"].get("integrations"),
                orchestration.as_object_mut(),
            ) {
                fields.insert("integrations".to_string(), integrations.clone());
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&orchestrations)?);
    } else if pipe {
        for orchestration in &orchestrations {
            println!("{}", text(orchestration, "id"));
        }
    } else {
        print_table(
            &["ID", "Name", "Description", "Team", "Routing Keys", "Routes"],
            &orchestration_rows(&orchestrations, &teams, delimiter),
        );
    }
    Ok(())
}

fn orchestration_rows(
    orchestrations: &[Value],
    teams: &HashMap<String, String>,
    delimiter: &str,
) -> Vec<Vec<String>> {
    orchestrations
        .iter()
        .map(|o| {
            let team = teams
                .get(&text(&o["team"], "id"))
                .cloned()
                .unwrap_or_default();
            let routing_keys = o["integrations"]
                .as_array()
                .map(|integrations| {
                    integrations
                        .iter()
                        .map(|i| text(&i["parameters"], "routing_key"))
                        .filter(|key| !key.is_empty())
                        .collect::<Vec<_>>()
                        .join(delimiter)
                })
                .unwrap_or_default();
            let routes = o
                .get("routes")
                .map(|routes| routes.to_string())
                .unwrap_or_default();
            vec![
                text(o, "id"),
                text(o, "name"),
                text(o, "description"),
                team,
                routing_keys,
                routes,
            ]
        })
        .collect()
}

use super::{build_client, parse_ids, print_batch_summary, report_failures};
use crate::api::{QueryParams, RequestSpec, constants::headers};
use crate::config::Config;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::*;
use log::info;
use serde_json::{Value, json};

#[derive(Args)]
pub struct IncidentCommands {
    #[command(subcommand)]
    pub command: IncidentSubcommands,
}

#[derive(Subcommand)]
pub enum IncidentSubcommands {
    /// Set the priority of incidents
    Priority {
        /// Incident IDs; repeat or separate with commas
        #[arg(short, long, conflicts_with = "me", required_unless_present = "me")]
        ids: Vec<String>,
        /// All incidents assigned to the current user
        #[arg(short, long)]
        me: bool,
        /// Name of the priority to set
        #[arg(short = 'n', long)]
        priority: String,
        /// Login email for the From header, needed with legacy API keys
        #[arg(short = 'F', long)]
        from: Option<String>,
    },
}

pub async fn incident_command(args: IncidentCommands, alias: Option<&str>) -> Result<()> {
    match args.command {
        IncidentSubcommands::Priority {
            ids,
            me,
            priority,
            from,
        } => set_priority(alias, ids, me, &priority, from).await,
    }
}

async fn set_priority(
    alias: Option<&str>,
    ids: Vec<String>,
    me: bool,
    priority_name: &str,
    from: Option<String>,
) -> Result<()> {
    let config = Config::load()?;
    let client = build_client(&config, alias)?;

    let incident_ids = if me {
        let user = client
            .me()
            .await?
            .context("--me needs a user token; legacy API keys have no user")?;
        let user_id = user
            .get("id")
            .and_then(Value::as_str)
            .context("users/me response has no user id")?;

        let mut params = QueryParams::new();
        params.insert("user_ids".to_string(), vec![user_id].into());
        let incidents = client.fetch_all("incidents", params, None).await?;
        incidents
            .iter()
            .filter_map(|i| i.get("id").and_then(Value::as_str).map(str::to_string))
            .collect()
    } else {
        parse_ids(&ids, "incident")?
    };

    if incident_ids.is_empty() {
        println!("{}", "No incidents found".yellow());
        return Ok(());
    }

    let priorities = client.priorities_by_name().await?;
    if priorities.is_empty() {
        anyhow::bail!("No incident priorities were found. Is the priority feature enabled?");
    }
    let priority_id = priorities
        .get(priority_name)
        .and_then(|p| p.get("id"))
        .and_then(Value::as_str)
        .with_context(|| format!("No incident priority matches name '{}'", priority_name))?;

    info!(
        "Setting priority {} ({}) on {} incidents",
        priority_name,
        priority_id,
        incident_ids.len()
    );
    let specs = priority_requests(&incident_ids, priority_id, from.as_deref())?;
    let batch = client.run_batch_default(&specs).await?;

    report_failures(&batch, |i| {
        format!("Failed to set priority on incident {}:", incident_ids[i])
    });
    print_batch_summary(&format!("Set priority {}", priority_name), &batch);
    Ok(())
}

/// One PUT per incident, in input order
fn priority_requests(incident_ids: &[String], priority_id: &str, from: Option<&str>) -> Result<Vec<RequestSpec>> {
    incident_ids
        .iter()
        .map(|id| {
            let body = json!({
                "incident": {
                    "type": "incident_reference",
                    "priority": {
                        "id": priority_id,
                        "type": "priority_reference"
                    }
                }
            });
            let mut builder = RequestSpec::put(format!("incidents/{}", id), body);
            if let Some(from) = from {
                builder = builder.header(headers::FROM, from);
            }
            Ok(builder.build()?)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;

    #[test]
    fn test_priority_requests() {
        let ids = vec!["Q1ABCDEF".to_string(), "Q2ABCDEF".to_string()];
        let specs = priority_requests(&ids, "PPRIO01", Some("ops@example.com")).unwrap();

        assert_eq!(specs.len(), 2);
        assert_eq!(specs[1].endpoint(), "incidents/Q2ABCDEF");
        assert_eq!(specs[0].method(), &Method::PUT);
        assert_eq!(specs[0].body().unwrap()["incident"]["priority"]["id"], "PPRIO01");
        assert_eq!(specs[0].headers().get("from").unwrap(), "ops@example.com");
    }
}

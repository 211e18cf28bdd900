//! Escalation policy commands

use super::{
    build_client, merge_unique, parse_ids, print_batch_summary, print_table, report_failures, resolve_id,
    resolve_names, text,
};
use crate::api::{QueryParams, RequestSpec};
use crate::config::Config;
use crate::utils;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::*;
use log::{info, warn};
use serde_json::{Value, json};

#[derive(Args)]
pub struct EpCommands {
    #[command(subcommand)]
    pub command: EpSubcommands,
}

#[derive(Subcommand)]
pub enum EpSubcommands {
    /// Make a copy of an escalation policy
    Copy {
        /// ID of the policy to copy
        #[arg(short, long, conflicts_with = "name", required_unless_present = "name")]
        id: Option<String>,
        /// Exact name of the policy to copy
        #[arg(short, long)]
        name: Option<String>,
        /// Name for the new policy
        #[arg(short, long)]
        destination: Option<String>,
    },
    /// Add targets to one level of escalation policies
    TargetAdd {
        /// Policy IDs; repeat or separate with commas
        #[arg(short, long, conflicts_with = "name", required_unless_present = "name")]
        ids: Vec<String>,
        /// Every policy whose name contains this text
        #[arg(short, long)]
        name: Option<String>,
        /// Level to add targets to, starting at 1
        #[arg(short, long)]
        level: usize,
        #[arg(short, long)]
        user_ids: Vec<String>,
        #[arg(short = 'U', long)]
        user_emails: Vec<String>,
        #[arg(short, long)]
        schedule_ids: Vec<String>,
        #[arg(short = 'S', long)]
        schedule_names: Vec<String>,
    },
    /// List the on-call shifts of an escalation policy
    Oncall {
        #[arg(short, long, conflicts_with = "name", required_unless_present = "name")]
        id: Option<String>,
        /// Exact name of the policy
        #[arg(short, long)]
        name: Option<String>,
        /// Start of the range, e.g. `now`, `3 days ago` or `2024-03-01`
        #[arg(long)]
        since: Option<String>,
        /// End of the range, e.g. `in 1 week`
        #[arg(long)]
        until: Option<String>,
        /// Print the full shift objects as JSON
        #[arg(short, long)]
        json: bool,
    },
}

pub async fn ep_command(args: EpCommands, alias: Option<&str>) -> Result<()> {
    match args.command {
        EpSubcommands::Copy {
            id,
            name,
            destination,
        } => copy(alias, id, name, destination).await,
        EpSubcommands::TargetAdd {
            ids,
            name,
            level,
            user_ids,
            user_emails,
            schedule_ids,
            schedule_names,
        } => {
            let targets = TargetArgs {
                user_ids,
                user_emails,
                schedule_ids,
                schedule_names,
            };
            target_add(alias, ids, name, level, targets).await
        }
        EpSubcommands::Oncall {
            id,
            name,
            since,
            until,
            json,
        } => oncall(alias, id, name, since, until, json).await,
    }
}

async fn copy(
    alias: Option<&str>,
    id: Option<String>,
    name: Option<String>,
    destination: Option<String>,
) -> Result<()> {
    let config = Config::load()?;
    let client = build_client(&config, alias)?;

    let ep_id = resolve_id(id, name.as_deref(), "escalation policy", |n| {
        client.escalation_policy_id_for_name(n)
    })
    .await?;

    let source = client
        .execute(&RequestSpec::get(format!("escalation_policies/{}", ep_id)).build()?)
        .await
        .into_result()
        .with_context(|| format!("Couldn't get escalation policy {}", ep_id))?;

    let destination = destination.unwrap_or_else(|| {
        let label = name.clone().unwrap_or_else(|| ep_id.clone());
        format!("{} copy {}", label, copy_timestamp())
    });
    let body = copy_body(&source, &destination)?;

    let created = client
        .execute(&RequestSpec::post("escalation_policies", body).build()?)
        .await
        .into_result()
        .context("Couldn't create escalation policy")?;

    let policy = &created["escalation_policy"];
    info!("Copied escalation policy {} to {}", ep_id, policy["id"]);
    println!(
        "Your new escalation policy {} is at {}",
        policy["id"].as_str().unwrap_or_default().bold(),
        policy["html_url"].as_str().unwrap_or_default().blue()
    );
    Ok(())
}

fn copy_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Body of the POST that recreates `source` under a new name
fn copy_body(source: &Value, destination: &str) -> Result<Value> {
    let policy = source
        .get("escalation_policy")
        .context("Response has no escalation_policy")?;

    Ok(json!({
        "escalation_policy": {
            "type": "escalation_policy",
            "name": destination,
            "description": policy.get("description"),
            "on_call_handoff_notifications": policy.get("on_call_handoff_notifications"),
            "num_loops": policy.get("num_loops"),
            "escalation_rules": policy.get("escalation_rules"),
        }
    }))
}

async fn oncall(
    alias: Option<&str>,
    id: Option<String>,
    name: Option<String>,
    since: Option<String>,
    until: Option<String>,
    json: bool,
) -> Result<()> {
    let config = Config::load()?;
    let client = build_client(&config, alias)?;

    let ep_id = resolve_id(id, name.as_deref(), "escalation policy", |n| {
        client.escalation_policy_id_for_name(n)
    })
    .await?;

    let mut params = QueryParams::new();
    params.insert("escalation_policy_ids".to_string(), vec![ep_id.clone()].into());
    let now = chrono::Utc::now();
    for (key, value) in [("since", since), ("until", until)] {
        if let Some(value) = value {
            let at = utils::parse_time(&value, now)
                .with_context(|| format!("Couldn't understand --{} '{}'", key, value))?;
            params.insert(key.to_string(), at.to_rfc3339().into());
        }
    }

    let oncalls = client
        .fetch_all("oncalls", params, None)
        .await
        .with_context(|| format!("Couldn't get on-calls for escalation policy {}", ep_id))?;
    if oncalls.is_empty() {
        println!("{}", "No on-call shifts found".yellow());
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&oncalls)?);
    } else {
        print_table(&["Start", "End", "Level", "User", "Schedule"], &oncall_rows(&oncalls));
    }
    Ok(())
}

/// One table row per shift; permanent shifts have no start or end
fn oncall_rows(oncalls: &[Value]) -> Vec<Vec<String>> {
    oncalls
        .iter()
        .map(|shift| {
            vec![
                text(shift, "start"),
                text(shift, "end"),
                shift
                    .get("escalation_level")
                    .map(|level| level.to_string())
                    .unwrap_or_default(),
                text(&shift["user"], "summary"),
                text(&shift["schedule"], "summary"),
            ]
        })
        .collect()
}

struct TargetArgs {
    user_ids: Vec<String>,
    user_emails: Vec<String>,
    schedule_ids: Vec<String>,
    schedule_names: Vec<String>,
}

async fn target_add(
    alias: Option<&str>,
    ids: Vec<String>,
    name: Option<String>,
    level: usize,
    targets: TargetArgs,
) -> Result<()> {
    if level < 1 {
        anyhow::bail!("The lowest level number is 1");
    }

    let config = Config::load()?;
    let client = build_client(&config, alias)?;

    let ep_ids = match name {
        Some(name) => {
            let mut params = QueryParams::new();
            params.insert("query".to_string(), name.as_str().into());
            let eps = client.fetch_all("escalation_policies", params, None).await?;
            if eps.is_empty() {
                anyhow::bail!("No escalation policies found matching '{}'", name);
            }
            eps.iter()
                .filter_map(|ep| ep.get("id").and_then(Value::as_str).map(str::to_string))
                .collect()
        }
        None => parse_ids(&ids, "escalation policy")?,
    };

    let schedule_ids = merge_unique(
        parse_ids(&targets.schedule_ids, "schedule")?,
        resolve_names(&targets.schedule_names, "schedule", |n| client.schedule_id_for_name(n)).await?,
    );
    let user_ids = merge_unique(
        parse_ids(&targets.user_ids, "user")?,
        resolve_names(&targets.user_emails, "user", |e| client.user_id_for_email(e)).await?,
    );
    if user_ids.is_empty() && schedule_ids.is_empty() {
        anyhow::bail!("No targets specified. Use --user-ids, --user-emails, --schedule-ids or --schedule-names");
    }

    let gets = ep_ids
        .iter()
        .map(|id| RequestSpec::get(format!("escalation_policies/{}", id)).build())
        .collect::<Result<Vec<_>, _>>()?;
    let fetched = client.run_batch_default(&gets).await?;
    report_failures(&fetched, |i| format!("Failed to get escalation policy {}:", ep_ids[i]));

    let mut puts = Vec::new();
    let mut put_ids = Vec::new();
    for source in fetched.successful_payloads() {
        let policy = &source["escalation_policy"];
        let id = policy["id"].as_str().unwrap_or_default().to_string();

        match updated_rules(policy, level, &user_ids, &schedule_ids) {
            Some(rules) => {
                let body = json!({
                    "escalation_policy": {
                        "id": id,
                        "escalation_rules": rules,
                    }
                });
                puts.push(RequestSpec::put(format!("escalation_policies/{}", id), body).build()?);
                put_ids.push(id);
            }
            None => {
                warn!("Escalation policy {} has no level {}", id, level);
                eprintln!(
                    "{} {} {}",
                    "Escalation policy".red().bold(),
                    policy["summary"].as_str().unwrap_or(&id).blue(),
                    format!("does not have level {}", level).red().bold()
                );
            }
        }
    }

    if puts.is_empty() {
        println!("{}", "Nothing to update".yellow());
        return Ok(());
    }

    // Each PUT replaces one policy's rules as a whole; failed ones are only reported
    let updated = client.run_batch_default(&puts).await?;
    report_failures(&updated, |i| format!("Failed to update escalation policy {}:", put_ids[i]));
    print_batch_summary(&format!("Add targets to level {}", level), &updated);
    Ok(())
}

/// The policy's rules with the targets merged into `level`, or `None` if it has no such level
fn updated_rules(policy: &Value, level: usize, user_ids: &[String], schedule_ids: &[String]) -> Option<Value> {
    let mut rules = policy.get("escalation_rules")?.as_array()?.clone();
    let rule = rules.get_mut(level - 1)?;

    let existing: Vec<&Value> = rule
        .get("targets")
        .and_then(Value::as_array)
        .map(|targets| targets.iter().collect())
        .unwrap_or_default();
    let ids_of = |kind: &str| -> Vec<String> {
        existing
            .iter()
            .filter(|t| t.get("type").and_then(Value::as_str) == Some(kind))
            .filter_map(|t| t.get("id").and_then(Value::as_str).map(str::to_string))
            .collect()
    };

    let users = merge_unique(ids_of("user_reference"), user_ids.to_vec());
    let schedules = merge_unique(ids_of("schedule_reference"), schedule_ids.to_vec());

    let targets: Vec<Value> = users
        .iter()
        .map(|id| json!({"id": id, "type": "user_reference"}))
        .chain(
            schedules
                .iter()
                .map(|id| json!({"id": id, "type": "schedule_reference"})),
        )
        .collect();
    rule["targets"] = Value::Array(targets);

    Some(Value::Array(rules))
}

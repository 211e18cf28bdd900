//! Schedule commands

use super::{build_client, parse_ids, resolve_id};
use crate::api::RequestSpec;
use crate::config::Config;
use crate::utils;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use colored::*;
use log::info;
use serde_json::{Value, json};

#[derive(Args)]
pub struct ScheduleCommands {
    #[command(subcommand)]
    pub command: ScheduleSubcommands,
}

#[derive(Subcommand)]
pub enum ScheduleSubcommands {
    /// Put a user on call in a schedule for a while
    OverrideAdd {
        /// ID of the schedule
        #[arg(short, long, conflicts_with = "name", required_unless_present = "name")]
        id: Option<String>,
        /// Exact name of the schedule
        #[arg(short, long)]
        name: Option<String>,
        /// When the override starts
        #[arg(long, default_value = "now")]
        start: String,
        /// When the override ends
        #[arg(long, default_value = "in 1 day")]
        end: String,
        #[arg(short, long, conflicts_with = "user_email", required_unless_present = "user_email")]
        user_id: Option<String>,
        #[arg(short = 'U', long)]
        user_email: Option<String>,
    },
}

pub async fn schedule_command(args: ScheduleCommands, alias: Option<&str>) -> Result<()> {
    match args.command {
        ScheduleSubcommands::OverrideAdd {
            id,
            name,
            start,
            end,
            user_id,
            user_email,
        } => override_add(alias, id, name, &start, &end, user_id, user_email).await,
    }
}

async fn override_add(
    alias: Option<&str>,
    id: Option<String>,
    name: Option<String>,
    start: &str,
    end: &str,
    user_id: Option<String>,
    user_email: Option<String>,
) -> Result<()> {
    let now = Utc::now();
    let start = utils::parse_time(start, now)
        .with_context(|| format!("Couldn't understand --start '{}'", start))?;
    let end = utils::parse_time(end, now)
        .with_context(|| format!("Couldn't understand --end '{}'", end))?;
    if end <= start {
        anyhow::bail!("The override must end after it starts");
    }

    let config = Config::load()?;
    let client = build_client(&config, alias)?;

    let schedule_id = resolve_id(id, name.as_deref(), "schedule", |n| {
        client.schedule_id_for_name(n)
    })
    .await?;
    let user_id = match (user_id, &user_email) {
        (Some(id), _) => parse_ids(&[id], "user")?
            .pop()
            .context("No user specified")?,
        (None, Some(email)) => client
            .user_id_for_email(email)
            .await?
            .with_context(|| format!("No user was found for the email '{}'", email))?,
        (None, None) => anyhow::bail!("Specify one of --user-id or --user-email"),
    };

    let spec = RequestSpec::post(
        format!("schedules/{}/overrides", schedule_id),
        override_body(&user_id, start, end),
    )
    .build()?;
    let created = client
        .execute(&spec)
        .await
        .into_result()
        .with_context(|| format!("Couldn't add an override to schedule {}", schedule_id))?;

    let override_id = created
        .get("override")
        .and_then(|o| o.get("id"))
        .and_then(Value::as_str)
        .context("The API did not return the new override")?;
    info!("Added override {} to schedule {}", override_id, schedule_id);
    println!(
        "{} {} {} {}",
        "Added override".green(),
        override_id.bold(),
        "to schedule".green(),
        schedule_id.bold()
    );
    Ok(())
}

fn override_body(user_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Value {
    json!({
        "override": {
            "start": start.to_rfc3339(),
            "end": end.to_rfc3339(),
            "user": {
                "id": user_id,
                "type": "user_reference",
            }
        }
    })
}

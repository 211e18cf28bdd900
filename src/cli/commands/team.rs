use super::{build_client, merge_unique, parse_ids, print_batch_summary, report_failures, resolve_names};
use crate::api::{QueryParams, RequestSpec};
use crate::config::Config;
use anyhow::Result;
use clap::{Args, Subcommand};
use colored::*;
use serde_json::Value;

#[derive(Args)]
pub struct TeamCommands {
    #[command(subcommand)]
    pub command: TeamSubcommands,
}

#[derive(Subcommand)]
pub enum TeamSubcommands {
    /// Remove escalation policies from teams
    EpRemove {
        /// Team IDs; repeat or separate with commas
        #[arg(short, long, conflicts_with = "name", required_unless_present = "name")]
        ids: Vec<String>,
        /// Every team whose name contains this text
        #[arg(short, long)]
        name: Option<String>,
        /// Escalation policy IDs to remove
        #[arg(short, long)]
        ep_ids: Vec<String>,
        /// Exact names of escalation policies to remove
        #[arg(short = 'E', long)]
        ep_names: Vec<String>,
    },
}

pub async fn team_command(args: TeamCommands, alias: Option<&str>) -> Result<()> {
    match args.command {
        TeamSubcommands::EpRemove {
            ids,
            name,
            ep_ids,
            ep_names,
        } => ep_remove(alias, ids, name, ep_ids, ep_names).await,
    }
}

async fn ep_remove(
    alias: Option<&str>,
    ids: Vec<String>,
    name: Option<String>,
    ep_ids: Vec<String>,
    ep_names: Vec<String>,
) -> Result<()> {
    let config = Config::load()?;
    let client = build_client(&config, alias)?;

    let team_ids: Vec<String> = match name {
        Some(name) => {
            let mut params = QueryParams::new();
            params.insert("query".to_string(), name.as_str().into());
            client
                .fetch_all("teams", params, None)
                .await?
                .iter()
                .filter_map(|team| team.get("id").and_then(Value::as_str).map(str::to_string))
                .collect()
        }
        None => parse_ids(&ids, "team")?,
    };
    if team_ids.is_empty() {
        println!("{}", "No teams found".yellow());
        return Ok(());
    }

    let ep_ids = merge_unique(
        parse_ids(&ep_ids, "escalation policy")?,
        resolve_names(&ep_names, "escalation policy", |n| {
            client.escalation_policy_id_for_name(n)
        })
        .await?,
    );
    if ep_ids.is_empty() {
        anyhow::bail!("No escalation policies specified. Use --ep-ids or --ep-names");
    }

    let pairs = cross_product(&team_ids, &ep_ids);
    let specs = pairs
        .iter()
        .map(|(team, ep)| RequestSpec::delete(format!("teams/{}/escalation_policies/{}", team, ep)).build())
        .collect::<Result<Vec<_>, _>>()?;

    let batch = client.run_batch_default(&specs).await?;
    report_failures(&batch, |i| {
        let (team, ep) = &pairs[i];
        format!("Failed to remove escalation policy {} from team {}:", ep, team)
    });
    print_batch_summary(
        &format!(
            "Remove {} escalation policies from {} teams",
            ep_ids.len(),
            team_ids.len()
        ),
        &batch,
    );
    Ok(())
}

/// Every (team, policy) pair, team-major
fn cross_product(team_ids: &[String], ep_ids: &[String]) -> Vec<(String, String)> {
    team_ids
        .iter()
        .flat_map(|team| ep_ids.iter().map(move |ep| (team.clone(), ep.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_product_is_team_major() {
        let teams = vec!["PTEAM01".to_string(), "PTEAM02".to_string()];
        let eps = vec!["PEP0001".to_string(), "PEP0002".to_string()];

        let pairs = cross_product(&teams, &eps);
        assert_eq!(pairs.len(), 4);
        assert_eq!(pairs[1], ("PTEAM01".to_string(), "PEP0002".to_string()));
        assert_eq!(pairs[2], ("PTEAM02".to_string(), "PEP0001".to_string()));
    }
}

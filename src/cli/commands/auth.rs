//! Stored credential management

use crate::config::{Config, CredentialKind, StoredCredential};
use anyhow::Result;
use clap::{Args, Subcommand};
use colored::*;
use log::warn;

#[derive(Args)]
pub struct AuthCommands {
    #[command(subcommand)]
    pub command: AuthSubcommands,
}

#[derive(Subcommand)]
pub enum AuthSubcommands {
    /// Store a new credential
    Add {
        /// Name for the credential
        #[arg(long)]
        name: String,
        /// API token
        #[arg(short, long)]
        token: String,
        /// The token is a legacy REST API key rather than a bearer token
        #[arg(long)]
        legacy: bool,
        /// Account subdomain, for display
        #[arg(long)]
        subdomain: Option<String>,
        /// Make this the default credential
        #[arg(long)]
        default: bool,
    },
    /// List stored credentials
    List,
    /// Make a stored credential the default
    Use {
        /// Credential name
        name: String,
    },
    /// Delete a stored credential
    Delete {
        /// Credential name
        name: String,
    },
}

pub async fn auth_command(args: AuthCommands) -> Result<()> {
    let mut config = Config::load()?;

    match args.command {
        AuthSubcommands::Add {
            name,
            token,
            legacy,
            subdomain,
            default,
        } => {
            let kind = if legacy {
                CredentialKind::Legacy
            } else {
                CredentialKind::Bearer
            };
            let stored = StoredCredential {
                token,
                kind,
                subdomain,
            };

            config.add_credential(&name, stored, default)?;
            config.save()?;
            println!("{} {}", "Stored credential".green(), name.bold());

            if let Err(e) = describe_identity(&config, &name).await {
                warn!("Could not verify credential {}: {:#}", name, e);
                println!("{} {:#}", "Could not verify the credential:".yellow(), e);
            }
            Ok(())
        }
        AuthSubcommands::List => {
            if config.credentials.is_empty() {
                println!("No credentials stored. Add one with `pd auth add`.");
                return Ok(());
            }

            for (name, stored) in &config.credentials {
                let marker = if config.default_alias.as_deref() == Some(name.as_str()) {
                    "*".green().bold().to_string()
                } else {
                    " ".to_string()
                };
                let kind = match stored.kind {
                    CredentialKind::Bearer => "bearer",
                    CredentialKind::Legacy => "legacy",
                };
                let subdomain = stored
                    .subdomain
                    .as_deref()
                    .map(|s| format!(" ({}.pagerduty.com)", s))
                    .unwrap_or_default();
                println!("{} {} [{}]{}", marker, name.bold(), kind, subdomain);
            }
            Ok(())
        }
        AuthSubcommands::Use { name } => {
            config.set_default(&name)?;
            config.save()?;
            println!("{} {}", "Default credential is now".green(), name.bold());
            Ok(())
        }
        AuthSubcommands::Delete { name } => {
            let removal = config.remove_credential(&name)?;
            config.save()?;
            println!("{} {}", "Deleted credential".green(), name.bold());

            match (removal.was_default, removal.new_default) {
                (true, Some(next)) => println!(
                    "That was your default credential; {} is the default now",
                    next.bold()
                ),
                (true, None) => println!(
                    "That was your only credential, so you're not logged in to PagerDuty any more"
                ),
                (false, _) => {}
            }
            Ok(())
        }
    }
}

/// Report who a stored credential authenticates as
async fn describe_identity(config: &Config, name: &str) -> Result<()> {
    let client = super::build_client(config, Some(name))?;

    match client.me().await? {
        Some(user) => println!(
            "Logged in as {} ({})",
            user.get("name").and_then(|v| v.as_str()).unwrap_or("unknown").bold(),
            user.get("email").and_then(|v| v.as_str()).unwrap_or("no email")
        ),
        None => {
            // Legacy keys have no user; any authorized read proves the key works
            let priorities = client.priorities_by_name().await?;
            println!(
                "Legacy API key accepted ({} priorities visible)",
                priorities.len()
            );
        }
    }
    Ok(())
}

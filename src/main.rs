use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use log::{debug, info};
use pagerduty_cli::cli::commands::{auth, ep, field, incident, orchestration, rest, schedule, team};
use pagerduty_cli::cli::{Cli, Commands};
use std::path::PathBuf;

fn log_file_path() -> Result<PathBuf> {
    let log_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("pagerduty-cli");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {:?}", log_dir))?;
    Ok(log_dir.join("pd-cli.log"))
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    // Initialize logger to file (truncate on each run)
    let log_path = log_file_path()?;
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file: {:?}", log_path))?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    let cli = Cli::parse();
    if cli.no_color {
        colored::control::set_override(false);
    }
    info!("Starting pd");
    debug!("Logging to {:?}", log_path);

    let alias = cli.alias.as_deref();
    match cli.command {
        Commands::Auth(args) => auth::auth_command(args).await,
        Commands::Rest(args) => rest::rest_command(args, alias).await,
        Commands::Incident(args) => incident::incident_command(args, alias).await,
        Commands::Ep(args) => ep::ep_command(args, alias).await,
        Commands::Team(args) => team::team_command(args, alias).await,
        Commands::Schedule(args) => schedule::schedule_command(args, alias).await,
        Commands::Field(args) => field::field_command(args, alias).await,
        Commands::Orchestration(args) => orchestration::orchestration_command(args, alias).await,
    }
}

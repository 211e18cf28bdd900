use super::commands::auth::AuthCommands;
use super::commands::ep::EpCommands;
use super::commands::field::FieldCommands;
use super::commands::incident::IncidentCommands;
use super::commands::orchestration::OrchestrationCommands;
use super::commands::rest::RestArgs;
use super::commands::schedule::ScheduleCommands;
use super::commands::team::TeamCommands;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pd")]
#[command(about = "A CLI tool for bulk operations against the PagerDuty REST API")]
#[command(version)]
pub struct Cli {
    /// Stored credential to use instead of the default
    #[arg(short, long, global = true)]
    pub alias: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Credential management
    Auth(AuthCommands),
    /// Make a raw request or fetch a whole collection
    Rest(RestArgs),
    /// Incident operations
    Incident(IncidentCommands),
    /// Escalation policy operations
    Ep(EpCommands),
    /// Team operations
    Team(TeamCommands),
    /// Schedule operations
    Schedule(ScheduleCommands),
    /// Custom field operations
    Field(FieldCommands),
    /// Event orchestration operations
    Orchestration(OrchestrationCommands),
}

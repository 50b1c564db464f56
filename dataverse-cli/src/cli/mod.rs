//! Command-line surface

pub mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "dataverse-cli",
    version,
    about = "Plan and inspect Dataverse data migrations"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Table-level commands
    #[command(subcommand)]
    Table(TableCommands),
}

#[derive(Subcommand)]
pub enum TableCommands {
    /// Compute a dependency-safe import order for a set of tables
    #[command(name = "define-migration-strategy", alias = "defineMigrationStrategy")]
    DefineMigrationStrategy(commands::table::StrategyArgs),
    /// Render the lookup graph as a Mermaid class diagram
    Diagram(commands::table::DiagramArgs),
    /// List the tables of a solution
    List(commands::table::ListArgs),
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Table(command) => match command {
            TableCommands::DefineMigrationStrategy(args) => {
                commands::table::define_migration_strategy(args).await
            }
            TableCommands::Diagram(args) => commands::table::diagram(args).await,
            TableCommands::List(args) => commands::table::list(args).await,
        },
    }
}

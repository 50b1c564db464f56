//! Handlers for the `table` command family

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use colored::Colorize;

use crate::api::DataverseClient;
use crate::api::models::MetadataSnapshot;
use crate::migration::{
    GraphBuildOptions, GraphBuildResult, MigrationAction, MigrationPlan, build_graph,
    plan_migration, to_mermaid,
};

/// Where the working set and its metadata come from.
#[derive(Args)]
pub struct SourceArgs {
    /// Unique name of the solution whose tables form the working set
    #[arg(long)]
    pub solution: Option<String>,

    /// Explicit comma-separated table logical names (overrides --solution)
    #[arg(long, value_delimiter = ',')]
    pub tables: Vec<String>,

    /// Read table metadata from a JSON snapshot instead of the Web API
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Include platform security tables (systemuser, team, ...) in the plan
    #[arg(long)]
    pub include_security_tables: bool,
}

#[derive(Args)]
pub struct StrategyArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Skip lookups that reference tables outside the working set
    #[arg(long)]
    pub skip_missing_tables: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: PlanFormat,

    /// Show diagnostic notes and per-action dependencies
    #[arg(long, short)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlanFormat {
    Text,
    Json,
}

#[derive(Args)]
pub struct DiagramArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Tolerate lookups that reference tables outside the working set
    #[arg(long)]
    pub skip_missing_tables: bool,

    /// Write the diagram to a file instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct ListArgs {
    /// Unique name of the solution
    #[arg(long)]
    pub solution: String,
}

pub async fn define_migration_strategy(args: StrategyArgs) -> Result<()> {
    let snapshot = load_snapshot(&args.source).await?;
    let built = build_working_graph(&snapshot, &args.source, args.skip_missing_tables)?;

    if args.verbose {
        if !built.missing_tables.is_empty() {
            println!(
                "{}",
                format!(
                    "Skipping lookups to missing table(s): {}",
                    built.missing_tables.join(", ")
                )
                .dimmed()
            );
        }
        if !built.excluded_security_tables.is_empty() {
            println!(
                "{}",
                format!(
                    "Excluded security table(s): {}",
                    built.excluded_security_tables.join(", ")
                )
                .dimmed()
            );
        }
    }

    let plan = plan_migration(built.graph)?;

    match args.format {
        PlanFormat::Text => print_plan(&plan, args.verbose),
        PlanFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&plan).context("failed to serialize the plan")?
        ),
    }
    Ok(())
}

pub async fn diagram(args: DiagramArgs) -> Result<()> {
    let snapshot = load_snapshot(&args.source).await?;
    let built = build_working_graph(&snapshot, &args.source, args.skip_missing_tables)?;

    let diagram = to_mermaid(&built.graph);
    if let Some(path) = args.output {
        fs::write(&path, &diagram)
            .with_context(|| format!("failed to write diagram to {}", path.display()))?;
        println!("Diagram written to {}", path.display().to_string().bright_green());
    } else {
        println!("{}", diagram);
    }
    Ok(())
}

pub async fn list(args: ListArgs) -> Result<()> {
    let client = DataverseClient::from_env()?;
    let tables = client.solution_tables(&args.solution).await?;

    for table in tables {
        println!("{}", table);
    }
    Ok(())
}

/// Resolve the metadata snapshot: `--input` file first, then the Web API
/// with either an explicit table list or a solution name.
async fn load_snapshot(source: &SourceArgs) -> Result<MetadataSnapshot> {
    if let Some(path) = &source.input {
        if !path.exists() {
            bail!("snapshot file does not exist: {}", path.display());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot file: {}", path.display()))?;
        return serde_json::from_str(&content)
            .with_context(|| format!("failed to parse snapshot file: {}", path.display()));
    }

    let client = DataverseClient::from_env()?;
    let tables = if !source.tables.is_empty() {
        source.tables.clone()
    } else if let Some(solution) = &source.solution {
        client.solution_tables(solution).await?
    } else {
        bail!("provide a working set via --input, --tables or --solution");
    };

    client.snapshot(&tables).await
}

fn build_working_graph(
    snapshot: &MetadataSnapshot,
    source: &SourceArgs,
    skip_missing_tables: bool,
) -> Result<GraphBuildResult> {
    let options = GraphBuildOptions {
        include_security_tables: source.include_security_tables,
        skip_missing_tables,
    };
    let built = build_graph(snapshot, &options);

    if !built.missing_tables.is_empty() && !skip_missing_tables {
        bail!(
            "the working set references table(s) that are not part of it: {}. \
             Add them to the set or pass --skip-missing-tables.",
            built.missing_tables.join(", ")
        );
    }
    Ok(built)
}

fn print_plan(plan: &MigrationPlan, verbose: bool) {
    for action in &plan.actions {
        match action {
            MigrationAction::Log { .. } => {
                if verbose {
                    println!("{}", action.describe().dimmed());
                }
                continue;
            }
            MigrationAction::FullImport { .. } => println!("{}", action.describe()),
            MigrationAction::ImportWithoutColumns { .. } => {
                println!("{}", action.describe().yellow())
            }
            MigrationAction::UpdateColumns { .. } => println!("{}", action.describe().cyan()),
        }

        if verbose && !action.depends_on().is_empty() {
            println!(
                "{}",
                format!("    depends on: {}", action.depends_on().join(", ")).dimmed()
            );
        }
    }
}

//! Migration strategy planning
//!
//! Computes a safe load order for records across tables connected by
//! lookup columns, so a bulk migration can insert rows without violating
//! referential integrity even when the schema contains reference cycles.
//!
//! The pipeline: build a [`TableGraph`] from table metadata, then let the
//! planner consume it into an ordered [`MigrationPlan`] by stripping
//! leaves, classifying the cycles that remain and untangling them.

pub mod actions;
pub mod builder;
pub mod cycles;
pub mod diagram;
pub mod graph;
pub mod planner;
mod untangle;

pub use actions::{MigrationAction, MigrationPlan};
pub use builder::{GraphBuildOptions, GraphBuildResult, SECURITY_TABLES, build_graph};
pub use cycles::{CycleComponent, CycleKind, find_components};
pub use diagram::to_mermaid;
pub use graph::{GraphError, LookupArc, TableGraph, TableNode};
pub use planner::{PlanError, ResidualTable, plan_migration};

//! Migration plan orchestrator
//!
//! Drives the reduce / classify / untangle loop over a consumable
//! [`TableGraph`] until the graph is empty (success) or no component can
//! be resolved (failure with the residual graph for manual analysis).
//!
//! Every iteration removes at least one table, so the loop terminates.

use std::collections::BTreeSet;

use super::actions::{MigrationAction, MigrationPlan};
use super::cycles::{CycleKind, find_components};
use super::graph::{LookupArc, TableGraph, name_key};
use super::untangle::{break_entangled, untangle_self_contained, untangle_self_loop};

/// Compute a dependency-safe, deterministic import plan for the graph.
///
/// The graph is consumed: tables are removed as they are resolved into
/// actions. On failure no partial plan is returned.
pub fn plan_migration(graph: TableGraph) -> Result<MigrationPlan, PlanError> {
    Planner::new(graph).run()
}

pub(crate) struct Planner {
    pub(crate) graph: TableGraph,
    pub(crate) plan: MigrationPlan,
    /// Keys of tables whose rows are already imported.
    pub(crate) loaded: BTreeSet<String>,
    /// Updates waiting for their target tables to be loaded, FIFO.
    pub(crate) pending: Vec<PendingUpdate>,
}

pub(crate) struct PendingUpdate {
    table: String,
    columns: Vec<String>,
    related_tables: Vec<String>,
    related_keys: BTreeSet<String>,
}

impl Planner {
    pub(crate) fn new(graph: TableGraph) -> Self {
        Self {
            graph,
            plan: MigrationPlan::default(),
            loaded: BTreeSet::new(),
            pending: Vec::new(),
        }
    }

    pub(crate) fn run(mut self) -> Result<MigrationPlan, PlanError> {
        loop {
            self.reduce_leaves();
            if self.graph.is_empty() {
                // every omitted column's target is loaded by now
                self.flush_pending();
                return Ok(self.plan);
            }

            let components = find_components(&self.graph);

            let self_loops: Vec<_> = components
                .iter()
                .filter(|c| c.kind == CycleKind::SelfLoop)
                .collect();
            if !self_loops.is_empty() {
                for component in self_loops {
                    untangle_self_loop(&mut self, component);
                }
                continue;
            }

            let contained: Vec<_> = components
                .iter()
                .filter(|c| c.kind == CycleKind::SelfContained)
                .collect();
            if !contained.is_empty() {
                for component in contained {
                    untangle_self_contained(&mut self, component);
                }
                continue;
            }

            let mut resolved = false;
            for component in components.iter().filter(|c| c.kind == CycleKind::Entangled) {
                if break_entangled(&mut self, component) {
                    resolved = true;
                    break;
                }
            }
            if resolved {
                continue;
            }

            return Err(PlanError::irreducible(&self.graph));
        }
    }

    /// Strip leaves in repeated passes: each pass collects every table
    /// with no outbound arcs, emits `FullImport` for them in key order,
    /// then removes them (which may expose new leaves for the next pass).
    fn reduce_leaves(&mut self) {
        loop {
            let leaves: Vec<String> = self
                .graph
                .tables()
                .filter(|node| node.is_leaf())
                .map(|node| node.key())
                .collect();
            if leaves.is_empty() {
                return;
            }
            for key in leaves {
                self.import_next(&key);
            }
            self.flush_pending();
        }
    }

    /// Import a table now, omitting every lookup column it still has in
    /// the graph, then remove it. Omitted columns are queued for a later
    /// `UpdateColumns` once their targets are loaded.
    pub(crate) fn import_next(&mut self, key: &str) {
        let Some(node) = self.graph.table(key) else {
            return;
        };
        let table = node.name().to_string();
        let omitted: Vec<LookupArc> = node.outbound().to_vec();

        if omitted.is_empty() {
            self.plan.push(MigrationAction::FullImport { table });
        } else {
            let mut columns: Vec<String> = omitted.iter().map(|a| a.column.clone()).collect();
            columns.sort();
            let related: BTreeSet<String> = omitted.iter().map(|a| a.to.clone()).collect();
            let related_tables: Vec<String> = related.into_iter().collect();
            let related_keys: BTreeSet<String> = omitted.iter().map(|a| a.to_key()).collect();

            self.plan.push(MigrationAction::ImportWithoutColumns {
                table: table.clone(),
                columns: columns.clone(),
                related_tables: related_tables.clone(),
            });
            self.pending.push(PendingUpdate {
                table,
                columns,
                related_tables,
                related_keys,
            });
        }

        self.graph.remove_table(key);
        self.loaded.insert(name_key(key));
    }

    /// Emit `UpdateColumns` for every queued update whose targets are all
    /// loaded, preserving queue order.
    pub(crate) fn flush_pending(&mut self) {
        let mut remaining = Vec::with_capacity(self.pending.len());
        for update in self.pending.drain(..) {
            if update.related_keys.iter().all(|k| self.loaded.contains(k)) {
                self.plan.push(MigrationAction::UpdateColumns {
                    table: update.table,
                    columns: update.columns,
                    related_tables: update.related_tables,
                });
            } else {
                remaining.push(update);
            }
        }
        self.pending = remaining;
    }

    pub(crate) fn push_log(&mut self, message: String) {
        self.plan.push(MigrationAction::Log { message });
    }
}

/// A table left unresolved when planning fails, with its outbound arcs.
#[derive(Debug, Clone)]
pub struct ResidualTable {
    pub table: String,
    pub lookups: Vec<LookupArc>,
}

/// Planning failure.
#[derive(Debug, Clone)]
pub enum PlanError {
    /// No self-loop, self-contained cycle or breakable entangled cycle
    /// remains among these tables.
    IrreducibleCycles { remaining: Vec<ResidualTable> },
}

impl PlanError {
    fn irreducible(graph: &TableGraph) -> Self {
        let remaining = graph
            .tables()
            .map(|node| ResidualTable {
                table: node.name().to_string(),
                lookups: node.outbound().to_vec(),
            })
            .collect();
        PlanError::IrreducibleCycles { remaining }
    }

    /// Tables named in the error, in key order.
    pub fn remaining_tables(&self) -> Vec<&str> {
        match self {
            PlanError::IrreducibleCycles { remaining } => {
                remaining.iter().map(|r| r.table.as_str()).collect()
            }
        }
    }
}

impl std::fmt::Display for PlanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanError::IrreducibleCycles { remaining } => {
                writeln!(
                    f,
                    "cannot determine a safe import order; {} table(s) remain entangled:",
                    remaining.len()
                )?;
                for residual in remaining {
                    let arcs: Vec<String> = residual
                        .lookups
                        .iter()
                        .map(|a| format!("{} -> {}", a.column, a.to))
                        .collect();
                    writeln!(f, "  {} ({})", residual.table, arcs.join(", "))?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for PlanError {}

//! Planned migration actions
//!
//! The planner's output is an ordered list of actions; nothing here moves
//! data. `Log` entries are diagnostics and only surface in verbose output.

use serde::Serialize;

/// One unit of planned migration work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MigrationAction {
    /// Every dependency of the table is already loaded; import all columns.
    #[serde(rename_all = "camelCase")]
    FullImport { table: String },
    /// Import the table but leave the listed lookup columns unset, because
    /// their target tables are not loaded yet.
    #[serde(rename_all = "camelCase")]
    ImportWithoutColumns {
        table: String,
        columns: Vec<String>,
        related_tables: Vec<String>,
    },
    /// Revisit an already-imported table and set the columns that were
    /// omitted earlier.
    #[serde(rename_all = "camelCase")]
    UpdateColumns {
        table: String,
        columns: Vec<String>,
        related_tables: Vec<String>,
    },
    /// Diagnostic note, not a data operation.
    #[serde(rename_all = "camelCase")]
    Log { message: String },
}

impl MigrationAction {
    /// The table this action operates on, if any.
    pub fn table(&self) -> Option<&str> {
        match self {
            MigrationAction::FullImport { table }
            | MigrationAction::ImportWithoutColumns { table, .. }
            | MigrationAction::UpdateColumns { table, .. } => Some(table),
            MigrationAction::Log { .. } => None,
        }
    }

    /// Tables this action depends on being loaded.
    pub fn depends_on(&self) -> &[String] {
        match self {
            MigrationAction::ImportWithoutColumns { related_tables, .. }
            | MigrationAction::UpdateColumns { related_tables, .. } => related_tables,
            _ => &[],
        }
    }

    pub fn is_log(&self) -> bool {
        matches!(self, MigrationAction::Log { .. })
    }

    /// Render the action as its fixed operator-facing phrase.
    pub fn describe(&self) -> String {
        match self {
            MigrationAction::FullImport { table } => {
                format!("Full import on table {}", table)
            }
            MigrationAction::ImportWithoutColumns { table, columns, .. } => {
                format!(
                    "Import table {} without column(s) {}",
                    table,
                    columns.join(", ")
                )
            }
            MigrationAction::UpdateColumns { table, columns, .. } => {
                format!(
                    "Update table {} to set column(s) {}",
                    table,
                    columns.join(", ")
                )
            }
            MigrationAction::Log { message } => message.clone(),
        }
    }
}

/// Ordered, deterministic sequence of migration actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationPlan {
    pub actions: Vec<MigrationAction>,
}

impl MigrationPlan {
    pub(crate) fn push(&mut self, action: MigrationAction) {
        self.actions.push(action);
    }

    /// Actions that move data, in plan order (`Log` entries skipped).
    pub fn data_actions(&self) -> impl Iterator<Item = &MigrationAction> {
        self.actions.iter().filter(|a| !a.is_log())
    }
}

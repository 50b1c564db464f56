//! Graph construction from a metadata snapshot
//!
//! Turns the working set of tables and their lookup columns into a
//! [`TableGraph`], applying the security-table filter and collecting the
//! tables that are referenced but absent from the set. The caller decides
//! whether missing tables are fatal.

use std::collections::BTreeSet;

use crate::api::models::MetadataSnapshot;

use super::graph::{TableGraph, name_key};

/// Platform-owned security tables. Their rows are never migrated, so they
/// are excluded from the working set unless explicitly requested.
pub const SECURITY_TABLES: &[&str] = &[
    "businessunit",
    "fieldsecurityprofile",
    "organization",
    "position",
    "queue",
    "role",
    "systemuser",
    "team",
    "teamtemplate",
];

fn is_security_table(key: &str) -> bool {
    SECURITY_TABLES.contains(&key)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GraphBuildOptions {
    /// Keep security tables in the working set instead of dropping them.
    pub include_security_tables: bool,
    /// Tolerate lookups whose target is absent from the working set.
    pub skip_missing_tables: bool,
}

#[derive(Debug, Clone)]
pub struct GraphBuildResult {
    pub graph: TableGraph,
    /// Tables referenced by a lookup but absent from the working set,
    /// sorted and deduplicated. Reported even when skipping is allowed.
    pub missing_tables: Vec<String>,
    /// Security tables dropped from the working set, sorted.
    pub excluded_security_tables: Vec<String>,
}

/// Build the lookup graph for a snapshot. Tables and lookups are visited
/// in key order so the resulting graph iterates reproducibly.
pub fn build_graph(snapshot: &MetadataSnapshot, options: &GraphBuildOptions) -> GraphBuildResult {
    let mut graph = TableGraph::new();
    let mut missing: BTreeSet<String> = BTreeSet::new();
    let mut excluded: BTreeSet<String> = BTreeSet::new();

    let mut tables: Vec<_> = snapshot.tables.iter().collect();
    tables.sort_by_key(|t| name_key(&t.logical_name));

    for table in &tables {
        let key = name_key(&table.logical_name);
        if !options.include_security_tables && is_security_table(&key) {
            excluded.insert(key);
            continue;
        }
        graph.add_table(&table.logical_name);
    }

    for table in &tables {
        if !graph.contains(&table.logical_name) {
            continue;
        }
        let mut lookups: Vec<_> = table.lookups.iter().collect();
        lookups.sort_by(|a, b| a.logical_name.cmp(&b.logical_name));

        for lookup in lookups {
            let target_key = name_key(&lookup.target_table);
            if graph.contains(&lookup.target_table) {
                if let Err(err) =
                    graph.add_lookup(&table.logical_name, &lookup.target_table, &lookup.logical_name)
                {
                    log::warn!(
                        "skipping lookup {}.{}: {}",
                        table.logical_name,
                        lookup.logical_name,
                        err
                    );
                }
                continue;
            }
            if !options.include_security_tables && is_security_table(&target_key) {
                // the platform owns those rows; the lookup needs no planning
                log::debug!(
                    "dropping lookup {}.{} to security table {}",
                    table.logical_name,
                    lookup.logical_name,
                    lookup.target_table
                );
                continue;
            }
            missing.insert(target_key);
        }
    }

    GraphBuildResult {
        graph,
        missing_tables: missing.into_iter().collect(),
        excluded_security_tables: excluded.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{LookupColumn, TableMetadata};

    fn make_table(name: &str, lookups: &[(&str, &str)]) -> TableMetadata {
        TableMetadata {
            logical_name: name.to_string(),
            lookups: lookups
                .iter()
                .map(|(column, target)| LookupColumn {
                    logical_name: column.to_string(),
                    target_table: target.to_string(),
                })
                .collect(),
        }
    }

    fn make_snapshot(tables: Vec<TableMetadata>) -> MetadataSnapshot {
        MetadataSnapshot { tables }
    }

    #[test]
    fn test_security_tables_excluded_by_default() {
        let snapshot = make_snapshot(vec![
            make_table("account", &[("owninguser", "systemuser")]),
            make_table("systemuser", &[("businessunitid", "businessunit")]),
        ]);

        let result = build_graph(&snapshot, &GraphBuildOptions::default());

        assert_eq!(result.graph.table_count(), 1);
        assert!(result.graph.contains("account"));
        assert_eq!(result.excluded_security_tables, vec!["systemuser"]);
        // lookups to security tables are dropped silently, not missing
        assert!(result.missing_tables.is_empty());
        assert_eq!(result.graph.arc_count(), 0);
    }

    #[test]
    fn test_security_tables_kept_when_requested() {
        let snapshot = make_snapshot(vec![
            make_table("account", &[("owninguser", "systemuser")]),
            make_table("systemuser", &[]),
        ]);
        let options = GraphBuildOptions {
            include_security_tables: true,
            ..Default::default()
        };

        let result = build_graph(&snapshot, &options);

        assert_eq!(result.graph.table_count(), 2);
        assert_eq!(result.graph.arc_count(), 1);
        assert!(result.excluded_security_tables.is_empty());
    }

    #[test]
    fn test_missing_tables_reported_and_arcs_never_dangle() {
        let snapshot = make_snapshot(vec![make_table(
            "order",
            &[("customerid", "account"), ("contactid", "contact")],
        )]);

        let result = build_graph(&snapshot, &GraphBuildOptions::default());

        assert_eq!(result.missing_tables, vec!["account", "contact"]);
        assert_eq!(result.graph.arc_count(), 0);

        // skipping changes nothing about the report, only the caller's verdict
        let tolerant = GraphBuildOptions {
            skip_missing_tables: true,
            ..Default::default()
        };
        let result = build_graph(&snapshot, &tolerant);
        assert_eq!(result.missing_tables, vec!["account", "contact"]);
    }

    #[test]
    fn test_self_lookups_become_self_arcs() {
        let snapshot = make_snapshot(vec![make_table(
            "account",
            &[("parentaccountid", "account")],
        )]);

        let result = build_graph(&snapshot, &GraphBuildOptions::default());

        let account = result.graph.table("account").unwrap();
        assert_eq!(account.self_columns(), vec!["parentaccountid"]);
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let forward = make_snapshot(vec![
            make_table("account", &[]),
            make_table("contact", &[("parentcustomerid", "account")]),
        ]);
        let backward = make_snapshot(vec![
            make_table("contact", &[("parentcustomerid", "account")]),
            make_table("account", &[]),
        ]);

        let a = build_graph(&forward, &GraphBuildOptions::default());
        let b = build_graph(&backward, &GraphBuildOptions::default());

        let names = |r: &GraphBuildResult| -> Vec<String> {
            r.graph.tables().map(|n| n.name().to_string()).collect()
        };
        assert_eq!(names(&a), names(&b));
        assert_eq!(a.graph.arc_count(), b.graph.arc_count());
    }
}

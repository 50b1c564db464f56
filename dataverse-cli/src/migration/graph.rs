//! Lookup dependency graph over a working set of tables
//!
//! Nodes are tables, arcs are lookup columns pointing at the table they
//! reference. The planner consumes the graph destructively: resolved
//! tables are removed together with every arc touching them.

use std::collections::{BTreeMap, BTreeSet};

/// Canonical ordering/identity key for a table name.
///
/// Table names are case-insensitive; every comparison and every ordering
/// decision in the planner goes through this one function.
pub(crate) fn name_key(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// A directed lookup arc: `from` references `to` through `column`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupArc {
    pub from: String,
    pub to: String,
    pub column: String,
}

impl LookupArc {
    pub(crate) fn to_key(&self) -> String {
        name_key(&self.to)
    }

    pub(crate) fn from_key(&self) -> String {
        name_key(&self.from)
    }
}

/// A table in the graph, with its outbound lookups and the mirror list of
/// inbound lookups from other tables.
#[derive(Debug, Clone)]
pub struct TableNode {
    name: String,
    outbound: Vec<LookupArc>,
    inbound: Vec<LookupArc>,
}

impl TableNode {
    fn new(name: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            outbound: Vec::new(),
            inbound: Vec::new(),
        }
    }

    /// Display name (first-seen spelling).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn key(&self) -> String {
        name_key(&self.name)
    }

    /// Lookups this table has to other tables (or to itself).
    pub fn outbound(&self) -> &[LookupArc] {
        &self.outbound
    }

    /// Lookups other tables have to this one.
    pub fn inbound(&self) -> &[LookupArc] {
        &self.inbound
    }

    /// A leaf has no unresolved outbound dependency.
    pub fn is_leaf(&self) -> bool {
        self.outbound.is_empty()
    }

    /// Columns of arcs this table has to itself.
    pub fn self_columns(&self) -> Vec<String> {
        let key = self.key();
        self.outbound
            .iter()
            .filter(|a| a.to_key() == key)
            .map(|a| a.column.clone())
            .collect()
    }

    /// True when the table still has outbound arcs and all of them are
    /// self-references.
    pub fn has_only_self_arcs(&self) -> bool {
        let key = self.key();
        !self.outbound.is_empty() && self.outbound.iter().all(|a| a.to_key() == key)
    }

    /// Keys of the tables this node points at.
    pub(crate) fn target_keys(&self) -> BTreeSet<String> {
        self.outbound.iter().map(|a| a.to_key()).collect()
    }
}

/// Mutable collection of tables and lookup arcs.
///
/// Invariant: both endpoints of every arc are tables currently present in
/// the graph; removing a table removes every arc touching it.
#[derive(Debug, Clone, Default)]
pub struct TableGraph {
    nodes: BTreeMap<String, TableNode>,
}

impl TableGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table. Adding an already-present name (any casing) is a no-op.
    pub fn add_table(&mut self, name: &str) {
        self.nodes
            .entry(name_key(name))
            .or_insert_with(|| TableNode::new(name));
    }

    /// Add a lookup arc between two present tables.
    ///
    /// Duplicate arcs (same source, target and column) are ignored.
    pub fn add_lookup(&mut self, from: &str, to: &str, column: &str) -> Result<(), GraphError> {
        let from_key = name_key(from);
        let to_key = name_key(to);

        let from_name = match self.nodes.get(&from_key) {
            Some(node) => node.name.clone(),
            None => {
                return Err(GraphError::UnknownTable {
                    table: from.to_string(),
                });
            }
        };
        let to_name = match self.nodes.get(&to_key) {
            Some(node) => node.name.clone(),
            None => {
                return Err(GraphError::UnknownTable {
                    table: to.to_string(),
                });
            }
        };

        let arc = LookupArc {
            from: from_name,
            to: to_name,
            column: column.to_string(),
        };

        if let Some(source) = self.nodes.get_mut(&from_key) {
            let duplicate = source
                .outbound
                .iter()
                .any(|a| a.to_key() == to_key && a.column.eq_ignore_ascii_case(column));
            if duplicate {
                return Ok(());
            }
            source.outbound.push(arc.clone());
        }
        if let Some(target) = self.nodes.get_mut(&to_key) {
            target.inbound.push(arc);
        }
        Ok(())
    }

    /// Remove a table and every arc touching it, in both directions.
    /// Removing an absent table is a no-op.
    pub fn remove_table(&mut self, name: &str) {
        let key = name_key(name);
        let Some(node) = self.nodes.remove(&key) else {
            return;
        };

        let mut touched: BTreeSet<String> = BTreeSet::new();
        touched.extend(node.outbound.iter().map(|a| a.to_key()));
        touched.extend(node.inbound.iter().map(|a| a.from_key()));

        for other_key in touched {
            if let Some(other) = self.nodes.get_mut(&other_key) {
                other.outbound.retain(|a| a.to_key() != key);
                other.inbound.retain(|a| a.from_key() != key);
            }
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableNode> {
        self.nodes.get(&name_key(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(&name_key(name))
    }

    /// Tables in canonical key order.
    pub fn tables(&self) -> impl Iterator<Item = &TableNode> {
        self.nodes.values()
    }

    /// Table keys in canonical order.
    pub(crate) fn keys(&self) -> Vec<String> {
        self.nodes.keys().cloned().collect()
    }

    pub fn table_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every arc in the graph, grouped by source table in key order.
    pub fn arcs(&self) -> Vec<&LookupArc> {
        self.nodes.values().flat_map(|n| n.outbound.iter()).collect()
    }

    pub fn arc_count(&self) -> usize {
        self.nodes.values().map(|n| n.outbound.len()).sum()
    }
}

/// Error building or mutating a [`TableGraph`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// An arc endpoint names a table that is not part of the graph.
    UnknownTable { table: String },
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphError::UnknownTable { table } => {
                write!(f, "table '{}' is not part of the working set", table)
            }
        }
    }
}

impl std::error::Error for GraphError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_graph(tables: &[&str], arcs: &[(&str, &str, &str)]) -> TableGraph {
        let mut graph = TableGraph::new();
        for table in tables {
            graph.add_table(table);
        }
        for (from, to, column) in arcs {
            graph.add_lookup(from, to, column).unwrap();
        }
        graph
    }

    #[test]
    fn test_add_table_is_idempotent() {
        let mut graph = make_graph(&["account", "contact"], &[("contact", "account", "parentid")]);
        graph.add_table("account");
        graph.add_table("ACCOUNT");

        assert_eq!(graph.table_count(), 2);
        // existing arcs survive a repeated add
        assert_eq!(graph.table("account").unwrap().inbound().len(), 1);
    }

    #[test]
    fn test_names_are_case_insensitive() {
        let mut graph = TableGraph::new();
        graph.add_table("Account");

        assert!(graph.contains("ACCOUNT"));
        assert_eq!(graph.table("account").unwrap().name(), "Account");
    }

    #[test]
    fn test_add_lookup_requires_both_endpoints() {
        let mut graph = TableGraph::new();
        graph.add_table("contact");

        let result = graph.add_lookup("contact", "account", "parentcustomerid");
        assert_eq!(
            result,
            Err(GraphError::UnknownTable {
                table: "account".to_string()
            })
        );
        assert_eq!(graph.arc_count(), 0);
    }

    #[test]
    fn test_duplicate_arcs_are_ignored() {
        let mut graph = make_graph(&["a", "b"], &[("a", "b", "col")]);
        graph.add_lookup("a", "b", "col").unwrap();
        graph.add_lookup("a", "b", "COL").unwrap();

        assert_eq!(graph.arc_count(), 1);
    }

    #[test]
    fn test_parallel_arcs_between_same_pair() {
        let graph = make_graph(&["order", "account"], &[
            ("order", "account", "customerid"),
            ("order", "account", "billingaccountid"),
        ]);

        assert_eq!(graph.arc_count(), 2);
        assert_eq!(graph.table("account").unwrap().inbound().len(), 2);
    }

    #[test]
    fn test_remove_table_cascades_both_directions() {
        let mut graph = make_graph(
            &["account", "contact", "order"],
            &[
                ("order", "account", "customerid"),
                ("order", "contact", "contactid"),
                ("contact", "account", "parentcustomerid"),
            ],
        );

        graph.remove_table("account");

        assert_eq!(graph.table_count(), 2);
        // only the arcs touching account are gone
        assert_eq!(graph.arc_count(), 1);
        let order = graph.table("order").unwrap();
        assert_eq!(order.outbound().len(), 1);
        assert_eq!(order.outbound()[0].column, "contactid");
        assert!(graph.table("contact").unwrap().is_leaf());
    }

    #[test]
    fn test_remove_leaf_keeps_unrelated_arcs_exact() {
        let mut graph = make_graph(
            &["a", "b", "c"],
            &[("b", "a", "a_id"), ("c", "b", "b_id"), ("c", "c", "parent_c")],
        );
        let before: Vec<(String, String, String)> = graph
            .arcs()
            .iter()
            .map(|a| (a.from.clone(), a.to.clone(), a.column.clone()))
            .collect();

        graph.remove_table("a");

        let after: Vec<(String, String, String)> = graph
            .arcs()
            .iter()
            .map(|a| (a.from.clone(), a.to.clone(), a.column.clone()))
            .collect();
        let expected: Vec<_> = before
            .into_iter()
            .filter(|(from, to, _)| from != "a" && to != "a")
            .collect();
        assert_eq!(after, expected);
    }

    #[test]
    fn test_remove_absent_table_is_noop() {
        let mut graph = make_graph(&["a"], &[]);
        graph.remove_table("missing");

        assert_eq!(graph.table_count(), 1);
    }

    #[test]
    fn test_self_arc_helpers() {
        let graph = make_graph(
            &["account", "contact"],
            &[
                ("account", "account", "parentaccountid"),
                ("contact", "account", "parentcustomerid"),
            ],
        );

        let account = graph.table("account").unwrap();
        assert!(account.has_only_self_arcs());
        assert_eq!(account.self_columns(), vec!["parentaccountid"]);

        let contact = graph.table("contact").unwrap();
        assert!(!contact.has_only_self_arcs());
        assert!(contact.self_columns().is_empty());
    }

    #[test]
    fn test_self_arc_dies_with_node() {
        let mut graph = make_graph(&["a"], &[("a", "a", "parent_a")]);
        graph.remove_table("a");

        assert!(graph.is_empty());
        assert_eq!(graph.arc_count(), 0);
    }
}

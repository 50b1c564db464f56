//! Cycle untangling strategies
//!
//! Each strategy turns one cyclic component into actions and shrinks the
//! graph. The shared import/pending machinery lives on [`Planner`]; the
//! strategies only decide which table goes first and whether the rest of
//! the component can be chained immediately.

use std::collections::BTreeSet;

use super::cycles::{CycleComponent, peel_order};
use super::planner::Planner;

/// Resolve a table whose remaining lookups all target itself: import it
/// without those columns, then set them right away.
pub(crate) fn untangle_self_loop(planner: &mut Planner, component: &CycleComponent) {
    let Some(key) = component.members.first() else {
        return;
    };
    let Some(node) = planner.graph.table(key) else {
        return;
    };
    let name = node.name().to_string();
    let columns = node.self_columns();

    planner.push_log(format!(
        "table {} references itself through column(s) {}; importing it without them",
        name,
        columns.join(", ")
    ));
    planner.import_next(key);
    planner.flush_pending();
}

/// Resolve a self-contained cycle with the chain walk: the break table is
/// imported without its lookup columns, the remaining members follow in
/// dependency order, and the deferred columns are set once the chain
/// closes.
pub(crate) fn untangle_self_contained(planner: &mut Planner, component: &CycleComponent) {
    let Some(break_table) = component.break_table.as_deref() else {
        return;
    };

    let mut rest: BTreeSet<String> = component.members.iter().cloned().collect();
    rest.remove(break_table);
    // classification guarantees the remainder is acyclic
    let Some(chain) = peel_order(&planner.graph, &rest) else {
        return;
    };

    planner.push_log(format!(
        "breaking cycle between table(s) {} at table {}",
        component.members.join(", "),
        break_table
    ));
    planner.import_next(break_table);
    for member in &chain {
        planner.import_next(member);
    }
    planner.flush_pending();
}

/// Break one entangled cycle: import its break table without any of its
/// lookup columns and leave the rest of the component in the graph for
/// later iterations. Returns false when the component has no break table.
pub(crate) fn break_entangled(planner: &mut Planner, component: &CycleComponent) -> bool {
    let Some(break_table) = component.break_table.as_deref() else {
        return false;
    };

    planner.push_log(format!(
        "entangled cycle between table(s) {}; deferring every lookup of table {}",
        component.members.join(", "),
        break_table
    ));
    planner.import_next(break_table);
    planner.flush_pending();
    true
}

//! Mermaid projection of the lookup graph
//!
//! Pure rendering; the planner never reads this output.

use super::graph::TableGraph;

/// Render the graph as a Mermaid class diagram: one class per table, one
/// labeled arrow per lookup column.
pub fn to_mermaid(graph: &TableGraph) -> String {
    let mut out = String::from("classDiagram\n");

    for node in graph.tables() {
        out.push_str(&format!("    class {}\n", node.name()));
    }
    for node in graph.tables() {
        for arc in node.outbound() {
            out.push_str(&format!("    {} --> {} : {}\n", arc.from, arc.to, arc.column));
        }
    }

    out
}

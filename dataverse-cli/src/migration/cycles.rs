//! Cycle detection and classification
//!
//! Runs only when leaf reduction has stalled on a non-empty graph. Finds
//! strongly-connected table sets and classifies each one so the planner
//! can pick the right untangling strategy.

use std::collections::{BTreeMap, BTreeSet};

use super::graph::TableGraph;

/// How a cyclic component can be untangled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleKind {
    /// Single table whose remaining lookups all target itself.
    SelfLoop,
    /// Two or more tables that reference only each other and admit a
    /// break table for the chain walk.
    SelfContained,
    /// Anything else that still contains a cycle: members with arcs
    /// escaping the component, tables mixing self-references with outside
    /// lookups, or mutually entangled rings with no break table.
    Entangled,
}

/// A strongly-connected set of tables that contains at least one cycle.
#[derive(Debug, Clone)]
pub struct CycleComponent {
    /// Member keys, sorted.
    pub members: Vec<String>,
    pub kind: CycleKind,
    /// Table to import first when breaking the component, when one exists.
    pub break_table: Option<String>,
}

/// Find and classify every cyclic component of the graph, ordered by
/// their first member key.
pub fn find_components(graph: &TableGraph) -> Vec<CycleComponent> {
    let mut components = Vec::new();

    for members in strongly_connected(graph) {
        let member_set: BTreeSet<String> = members.iter().cloned().collect();

        if members.len() == 1 {
            let key = members[0].clone();
            let Some(node) = graph.table(&key) else { continue };
            if node.self_columns().is_empty() {
                // not part of any cycle
                continue;
            }
            let kind = if node.has_only_self_arcs() {
                CycleKind::SelfLoop
            } else {
                CycleKind::Entangled
            };
            components.push(CycleComponent {
                members,
                kind,
                break_table: Some(key),
            });
            continue;
        }

        let escapes = members.iter().any(|key| {
            graph
                .table(key)
                .map(|node| node.target_keys().iter().any(|t| !member_set.contains(t)))
                .unwrap_or(false)
        });
        let break_table = break_candidate(graph, &member_set);
        let kind = if !escapes && break_table.is_some() {
            CycleKind::SelfContained
        } else {
            CycleKind::Entangled
        };
        components.push(CycleComponent {
            members,
            kind,
            break_table,
        });
    }

    components.sort_by(|a, b| a.members.cmp(&b.members));
    components
}

/// First member (key order) whose removal leaves the rest of the set
/// acyclic, self-arcs ignored. This is the table imported first when the
/// component is broken.
pub(crate) fn break_candidate(graph: &TableGraph, members: &BTreeSet<String>) -> Option<String> {
    for candidate in members {
        let mut rest = members.clone();
        rest.remove(candidate);
        if peel_order(graph, &rest).is_some() {
            return Some(candidate.clone());
        }
    }
    None
}

/// Dependency-ordered peel of a subset of the graph: repeated passes
/// collect every member whose remaining in-set targets are all peeled,
/// key order within a pass. Self-arcs and arcs leaving the subset are
/// ignored. Returns `None` if the subset still contains a cycle.
pub(crate) fn peel_order(graph: &TableGraph, members: &BTreeSet<String>) -> Option<Vec<String>> {
    let mut remaining = members.clone();
    let mut order = Vec::with_capacity(members.len());

    while !remaining.is_empty() {
        let ready: Vec<String> = remaining
            .iter()
            .filter(|key| {
                graph.table(key).is_some_and(|node| {
                    node.outbound()
                        .iter()
                        .all(|arc| arc.to_key() == **key || !remaining.contains(&arc.to_key()))
                })
            })
            .cloned()
            .collect();

        if ready.is_empty() {
            return None;
        }
        for key in &ready {
            remaining.remove(key);
        }
        order.extend(ready);
    }

    Some(order)
}

/// Tarjan's algorithm, iterative, visiting nodes and neighbors in key
/// order so component discovery is reproducible.
fn strongly_connected(graph: &TableGraph) -> Vec<Vec<String>> {
    let keys = graph.keys();
    let neighbors: BTreeMap<String, Vec<String>> = keys
        .iter()
        .map(|key| {
            let targets: Vec<String> = graph
                .table(key)
                .map(|node| {
                    node.target_keys()
                        .into_iter()
                        .filter(|t| t != key)
                        .collect()
                })
                .unwrap_or_default();
            (key.clone(), targets)
        })
        .collect();

    let mut index: BTreeMap<String, usize> = BTreeMap::new();
    let mut lowlink: BTreeMap<String, usize> = BTreeMap::new();
    let mut on_stack: BTreeSet<String> = BTreeSet::new();
    let mut stack: Vec<String> = Vec::new();
    let mut next_index = 0usize;
    let mut components = Vec::new();

    for root in &keys {
        if index.contains_key(root) {
            continue;
        }

        let mut frames: Vec<(String, usize)> = vec![(root.clone(), 0)];
        while let Some((node, progress)) = frames.pop() {
            if progress == 0 {
                index.insert(node.clone(), next_index);
                lowlink.insert(node.clone(), next_index);
                next_index += 1;
                stack.push(node.clone());
                on_stack.insert(node.clone());
            }

            let outgoing = &neighbors[&node];
            if progress < outgoing.len() {
                let next = outgoing[progress].clone();
                frames.push((node.clone(), progress + 1));
                if !index.contains_key(&next) {
                    frames.push((next, 0));
                } else if on_stack.contains(&next) {
                    let reached = index[&next];
                    let current = lowlink[&node];
                    lowlink.insert(node, current.min(reached));
                }
                continue;
            }

            if lowlink[&node] == index[&node] {
                let mut component = Vec::new();
                while let Some(member) = stack.pop() {
                    on_stack.remove(&member);
                    let done = member == node;
                    component.push(member);
                    if done {
                        break;
                    }
                }
                component.sort();
                components.push(component);
            }

            if let Some((parent, _)) = frames.last() {
                let child_low = lowlink[&node];
                let parent_low = lowlink[parent];
                lowlink.insert(parent.clone(), parent_low.min(child_low));
            }
        }
    }

    components
}

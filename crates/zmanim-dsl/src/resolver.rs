//! Dependency resolution over a formula set.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::ast::Node;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DependencyError {
    /// The reference graph has a cycle. `path` starts and ends with the same
    /// key, e.g. `[a, b, a]`.
    #[error("circular reference: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },

    #[error("formula '{formula}' references unknown zman '@{reference}'")]
    UnknownReference { formula: String, reference: String },
}

impl DependencyError {
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::Cycle { .. })
    }

    /// Key of the formula the error is attributed to.
    pub fn key(&self) -> &str {
        match self {
            Self::Cycle { path } => path.first().map(String::as_str).unwrap_or(""),
            Self::UnknownReference { formula, .. } => formula,
        }
    }
}

/// Direct references of every formula, in first-appearance order.
pub fn dependency_graph(formulas: &BTreeMap<String, Node>) -> BTreeMap<&str, Vec<&str>> {
    formulas
        .iter()
        .map(|(key, node)| (key.as_str(), node.references()))
        .collect()
}

/// Order `formulas` so every formula comes after the ones it references.
///
/// Formulas with no ordering constraint between them appear in key order.
/// Unknown references are reported before cycles.
pub fn resolve(formulas: &BTreeMap<String, Node>) -> Result<Vec<String>, DependencyError> {
    let graph = dependency_graph(formulas);

    for (key, refs) in &graph {
        if let Some(missing) = refs.iter().find(|r| !formulas.contains_key(**r)) {
            return Err(DependencyError::UnknownReference {
                formula: key.to_string(),
                reference: missing.to_string(),
            });
        }
    }

    let mut done: HashSet<&str> = HashSet::new();
    let mut order: Vec<String> = Vec::with_capacity(formulas.len());

    for key in graph.keys() {
        if !done.contains(key) {
            visit(key, &graph, &mut done, &mut order)?;
        }
    }

    debug!(count = order.len(), "resolved evaluation order");
    Ok(order)
}

/// Check that nothing reachable from `start` is part of a cycle.
///
/// References to keys absent from `formulas` are skipped; use [`resolve`]
/// when they must be reported.
pub fn check_cycles_from(formulas: &BTreeMap<String, Node>, start: &str) -> Result<(), DependencyError> {
    let graph = dependency_graph(formulas);
    let mut done = HashSet::new();
    let mut order = Vec::new();
    visit(start, &graph, &mut done, &mut order)
}

/// Post-order DFS with an explicit stack, so long reference chains cannot
/// exhaust the thread stack. A neighbor already on the current path closes a
/// cycle.
fn visit<'a>(
    start: &'a str,
    graph: &BTreeMap<&'a str, Vec<&'a str>>,
    done: &mut HashSet<&'a str>,
    order: &mut Vec<String>,
) -> Result<(), DependencyError> {
    // (node, index of the next neighbor to look at)
    let mut path: Vec<(&'a str, usize)> = vec![(start, 0)];
    let mut on_path: HashSet<&'a str> = HashSet::from([start]);

    while let Some(frame) = path.last_mut() {
        let node = frame.0;
        let next = graph.get(node).and_then(|refs| refs.get(frame.1)).copied();
        frame.1 += 1;

        match next {
            Some(neighbor) if on_path.contains(neighbor) => {
                let from = path.iter().position(|(n, _)| *n == neighbor).unwrap_or(0);
                let mut cycle: Vec<String> = path[from..].iter().map(|(n, _)| n.to_string()).collect();
                cycle.push(neighbor.to_string());
                return Err(DependencyError::Cycle { path: cycle });
            }
            Some(neighbor) => {
                if !done.contains(neighbor) {
                    on_path.insert(neighbor);
                    path.push((neighbor, 0));
                }
            }
            None => {
                path.pop();
                on_path.remove(node);
                done.insert(node);
                order.push(node.to_string());
            }
        }
    }
    Ok(())
}

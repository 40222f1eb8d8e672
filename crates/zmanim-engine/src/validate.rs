use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;
use zmanim_core::Formula;
use zmanim_dsl::{DependencyError, Node, check_cycles_from, parse};

use crate::error::ValidationError;

/// Check one formula as it would be saved into `existing`.
///
/// The candidate must parse, every `@reference` must name a key in
/// `existing` (or the candidate itself, which then surfaces as a cycle), and
/// saving it must not close a cycle. A formula already in `existing` under
/// `key` is treated as replaced. Other formulas in the set that do not parse
/// are ignored. No primitive is ever evaluated.
pub fn validate(key: &str, source: &str, existing: &[Formula]) -> Result<Node, ValidationError> {
    let node = parse(source)?;

    let known: BTreeSet<&str> = existing
        .iter()
        .map(|f| f.key.as_str())
        .chain(std::iter::once(key))
        .collect();
    if let Some(missing) = node.references().into_iter().find(|r| !known.contains(r)) {
        return Err(DependencyError::UnknownReference {
            formula: key.to_string(),
            reference: missing.to_string(),
        }
        .into());
    }

    let mut graph: BTreeMap<String, Node> = existing
        .iter()
        .filter(|f| f.key != key)
        .filter_map(|f| parse(&f.source).ok().map(|n| (f.key.clone(), n)))
        .collect();
    graph.insert(key.to_string(), node.clone());
    check_cycles_from(&graph, key)?;

    debug!(zman_key = %key, "formula valid");
    Ok(node)
}

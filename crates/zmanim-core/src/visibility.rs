//! Per-day visibility filter.
//!
//! This is the only place negated-tag suppression is decided.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::formula::TagAssociation;

/// Tag identifiers active on one calendar day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayTagSet(BTreeSet<String>);

impl DayTagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: impl Into<String>) -> bool {
        self.0.insert(tag.into())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for DayTagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Returns `false` iff some negated association names a tag active today.
pub fn should_show(zman_tags: &[TagAssociation], active: &DayTagSet) -> bool {
    !zman_tags
        .iter()
        .any(|t| t.is_negated && active.contains(&t.tag))
}

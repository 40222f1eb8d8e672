//! Formula data model.
//!
//! A [`Formula`] is a named, immutable piece of DSL text plus the display
//! metadata a publisher attaches to it. Formula sets are usually loaded from
//! disk through [`crate::formula_file`].

use serde::{Deserialize, Serialize};

use crate::enums::{RoundingMode, TimeCategory};

/// A tag linked to a zman, optionally negated.
///
/// A negated association hides the zman on any day where the tag is active
/// (see [`crate::visibility::should_show`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagAssociation {
    pub tag: String,
    #[serde(default, alias = "negated")]
    pub is_negated: bool,
}

impl TagAssociation {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            is_negated: false,
        }
    }

    pub fn negated(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            is_negated: true,
        }
    }
}

/// A named formula as supplied by a publisher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formula {
    /// Unique key within the formula set (referenced as `@key`).
    pub key: String,

    /// DSL text.
    #[serde(alias = "formula")]
    pub source: String,

    #[serde(default, alias = "rounding")]
    pub rounding_mode: RoundingMode,

    #[serde(default)]
    pub category: TimeCategory,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TagAssociation>,
}

impl Formula {
    pub fn new(key: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            source: source.into(),
            rounding_mode: RoundingMode::default(),
            category: TimeCategory::default(),
            tags: Vec::new(),
        }
    }

    pub fn with_rounding(mut self, mode: RoundingMode) -> Self {
        self.rounding_mode = mode;
        self
    }

    pub fn with_category(mut self, category: TimeCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_tag(mut self, tag: TagAssociation) -> Self {
        self.tags.push(tag);
        self
    }
}

/// A publisher's complete formula set as stored in a formula file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormulaSet {
    /// Optional display name of the owning publisher.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub publisher: String,

    #[serde(default)]
    pub zmanim: Vec<Formula>,

    /// Where this set was loaded from (set by the loader).
    #[serde(skip)]
    pub source_path: String,
}

impl FormulaSet {
    pub fn get(&self, key: &str) -> Option<&Formula> {
        self.zmanim.iter().find(|f| f.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.zmanim.iter().map(|f| f.key.as_str())
    }
}

//! Command handlers, one module per subcommand.

pub mod cache_cmd;
pub mod calc;
pub mod completion;
pub mod order;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use zmanim_core::FormulaSet;
use zmanim_core::formula_file::load_formula_set;

/// Load a formula set file with the path in the error.
pub(crate) fn load_formulas(path: &Path) -> Result<FormulaSet> {
    load_formula_set(path).with_context(|| format!("failed to load formulas from {}", path.display()))
}

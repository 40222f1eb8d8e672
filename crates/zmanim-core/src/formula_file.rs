//! Load formula sets from YAML, TOML or JSON files.

use std::path::Path;

use tracing::debug;

use crate::formula::FormulaSet;

#[derive(Debug, thiserror::Error)]
pub enum FormulaFileError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Parse a formula set from a YAML string.
pub fn parse_yaml(content: &str) -> Result<FormulaSet, FormulaFileError> {
    serde_yaml::from_str(content).map_err(|e| FormulaFileError::Parse(e.to_string()))
}

/// Parse a formula set from a TOML string (`[[zmanim]]` tables).
pub fn parse_toml(content: &str) -> Result<FormulaSet, FormulaFileError> {
    toml::from_str(content).map_err(|e| FormulaFileError::Parse(e.to_string()))
}

/// Parse a formula set from a JSON string.
pub fn parse_json(content: &str) -> Result<FormulaSet, FormulaFileError> {
    serde_json::from_str(content).map_err(|e| FormulaFileError::Parse(e.to_string()))
}

/// Load a formula set from disk, picking the format by extension.
pub fn load_formula_set(path: &Path) -> Result<FormulaSet, FormulaFileError> {
    let content = std::fs::read_to_string(path)?;
    let mut set = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => parse_yaml(&content)?,
        Some("toml") => parse_toml(&content)?,
        Some("json") => parse_json(&content)?,
        // JSON is a YAML subset, so YAML covers both.
        _ => parse_yaml(&content).or_else(|_| parse_toml(&content))?,
    };
    set.source_path = path.display().to_string();
    debug!(path = %path.display(), count = set.zmanim.len(), "loaded formula set");
    Ok(set)
}

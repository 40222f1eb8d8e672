//! Output formatting helpers for the `zm` CLI.

use std::io::{self, Write};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use zmanim_core::CalculatedZman;
use zmanim_engine::FormulaFailure;

/// JSON shape of a calculated day.
#[derive(Serialize)]
pub struct DayView<'a> {
    pub date: NaiveDate,
    pub timezone: &'a str,
    pub from_cache: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<DateTime<Utc>>,
    pub zmanim: &'a [CalculatedZman],
    pub failures: Vec<FailureView>,
}

#[derive(Serialize)]
pub struct FailureView {
    pub key: String,
    pub error: String,
}

impl From<&FormulaFailure> for FailureView {
    fn from(f: &FormulaFailure) -> Self {
        Self {
            key: f.key.clone(),
            error: f.error.to_string(),
        }
    }
}

/// Print a value as pretty-printed JSON to stdout.
pub fn output_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize JSON")?;
    let mut handle = io::stdout().lock();
    // Broken pipes (e.g. piped to `head`) are not errors.
    let _ = writeln!(handle, "{json}");
    Ok(())
}

/// One row per zman: key, display time, exact time, category.
pub fn format_zmanim_table(zmanim: &[CalculatedZman]) -> String {
    let width = zmanim.iter().map(|z| z.key.len()).max().unwrap_or(0);
    let mut out = String::new();
    for z in zmanim {
        out.push_str(&format!(
            "{:<width$}  {}  ({}, {})  {}\n",
            z.key, z.rounded, z.exact, z.rounding_mode, z.category
        ));
    }
    out
}

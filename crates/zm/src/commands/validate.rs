//! `zm validate` -- check one formula against a set.

use anyhow::{Result, anyhow};
use serde_json::json;
use zmanim_engine::{ValidationError, validate};

use crate::cli::ValidateArgs;
use crate::commands::load_formulas;
use crate::context::RuntimeContext;
use crate::output::output_json;

pub fn run(ctx: &RuntimeContext, args: &ValidateArgs) -> Result<()> {
    let existing = match &args.formulas {
        Some(path) => load_formulas(path)?.zmanim,
        None => Vec::new(),
    };

    let node = validate(&args.key, &args.source, &existing).map_err(|e| match &e {
        ValidationError::Parse(p) => anyhow!(
            "invalid formula '{}' at offset {}: {}\n  {}\n  {}^",
            args.key,
            p.offset(),
            e,
            args.source,
            " ".repeat(p.offset())
        ),
        ValidationError::Dependency(_) => anyhow!("invalid formula '{}': {}", args.key, e),
    })?;

    if ctx.json {
        output_json(&json!({
            "key": args.key,
            "valid": true,
            "canonical": node.to_string(),
            "references": node.references(),
        }))
    } else {
        println!("{}: ok ({})", args.key, node);
        Ok(())
    }
}

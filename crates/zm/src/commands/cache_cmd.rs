//! `zm cache` -- invalidate or purge cached days.

use anyhow::{Context, Result};
use serde_json::json;
use zmanim_cache::InvalidationScope;

use crate::cli::{CacheArgs, CacheCommands, InvalidateArgs};
use crate::context::RuntimeContext;
use crate::output::output_json;

pub fn run(ctx: &RuntimeContext, args: &CacheArgs) -> Result<()> {
    match &args.command {
        CacheCommands::Invalidate(a) => run_invalidate(ctx, a),
        CacheCommands::Purge => run_purge(ctx),
    }
}

fn run_invalidate(ctx: &RuntimeContext, args: &InvalidateArgs) -> Result<()> {
    let facade = ctx.cache_facade()?;
    let scope = match &args.locality {
        Some(locality) => InvalidationScope::Locality {
            publisher: args.publisher.clone(),
            locality: locality.clone(),
        },
        None => InvalidationScope::Publisher(args.publisher.clone()),
    };
    let removed = facade
        .invalidate(&scope)
        .with_context(|| format!("failed to invalidate {scope}"))?;

    if ctx.json {
        return output_json(&json!({ "scope": scope.to_string(), "removed": removed }));
    }
    println!("Invalidated {removed} cached day(s) for {scope}");
    Ok(())
}

fn run_purge(ctx: &RuntimeContext) -> Result<()> {
    let removed = ctx.cache_facade()?.purge_expired().context("failed to purge cache")?;

    if ctx.json {
        return output_json(&json!({ "removed": removed }));
    }
    println!("Purged {removed} expired cache entr{}", if removed == 1 { "y" } else { "ies" });
    Ok(())
}

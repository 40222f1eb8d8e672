//! `zm calc` -- calculate one day of zmanim.

use std::collections::BTreeMap;

use anyhow::{Context, Result, anyhow, bail};
use zmanim_astro::{CachingProvider, TableProvider};
use zmanim_core::{DayTagSet, Location, RoundingMode};
use zmanim_engine::{CalculationRequest, ServiceResult, ZmanimService, calculate};

use crate::cli::CalcArgs;
use crate::commands::load_formulas;
use crate::context::RuntimeContext;
use crate::output::{DayView, FailureView, format_zmanim_table, output_json};

pub fn run(ctx: &RuntimeContext, args: &CalcArgs) -> Result<()> {
    let set = load_formulas(&args.formulas)?;
    let location = Location::with_zone_name(args.lat, args.lon, args.elevation, &args.tz)
        .context("invalid location")?;
    let table = TableProvider::load(&args.ephemeris)
        .with_context(|| format!("failed to load ephemeris from {}", args.ephemeris.display()))?;
    let provider = CachingProvider::new(table);

    let mut request = CalculationRequest::new(set.zmanim, args.date, location)
        .with_active_tags(args.tags.iter().map(String::as_str).collect::<DayTagSet>())
        .sorted_by_category(args.category_order || ctx.config.output.category_order);
    request.rounding_overrides = parse_rounding_overrides(&args.rounding)?;

    let result = match (&args.publisher, &args.locality) {
        (Some(publisher), Some(locality)) => {
            let service = ZmanimService::new(provider, ctx.cache_facade()?);
            service.calculate(publisher, locality, &request)?
        }
        _ => {
            let calc = calculate(&request, &provider)?;
            ServiceResult {
                zmanim: calc.zmanim,
                from_cache: false,
                cached_at: chrono::Utc::now(),
                failures: calc.failures,
            }
        }
    };

    for failure in &result.failures {
        eprintln!("warning: {} omitted: {}", failure.key, failure.error);
    }

    if ctx.json {
        return output_json(&DayView {
            date: args.date,
            timezone: request.location.timezone.name(),
            from_cache: result.from_cache,
            cached_at: result.from_cache.then_some(result.cached_at),
            zmanim: &result.zmanim,
            failures: result.failures.iter().map(FailureView::from).collect(),
        });
    }

    let source = if result.from_cache { "  (cached)" } else { "" };
    println!("{}  {}{}", args.date, request.location.timezone, source);
    print!("{}", format_zmanim_table(&result.zmanim));
    Ok(())
}

/// Parse repeated `KEY=MODE` flags.
fn parse_rounding_overrides(raw: &[String]) -> Result<BTreeMap<String, RoundingMode>> {
    let mut overrides = BTreeMap::new();
    for item in raw {
        let Some((key, mode)) = item.split_once('=') else {
            bail!("invalid --round '{item}': expected KEY=MODE");
        };
        let mode: RoundingMode = mode.parse().map_err(|e| anyhow!("invalid --round '{item}': {e}"))?;
        overrides.insert(key.trim().to_string(), mode);
    }
    Ok(overrides)
}

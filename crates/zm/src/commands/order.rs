//! `zm order` -- print the evaluation order of a formula set.

use anyhow::Result;
use zmanim_engine::evaluation_order;

use crate::cli::OrderArgs;
use crate::commands::load_formulas;
use crate::context::RuntimeContext;
use crate::output::output_json;

pub fn run(ctx: &RuntimeContext, args: &OrderArgs) -> Result<()> {
    let set = load_formulas(&args.formulas)?;
    let order = evaluation_order(&set.zmanim)?;

    if ctx.json {
        return output_json(&order);
    }
    for (i, key) in order.iter().enumerate() {
        println!("{:>3}. {key}", i + 1);
    }
    Ok(())
}

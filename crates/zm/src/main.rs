//! `zm` -- zmanim formula engine CLI.
//!
//! Parses CLI arguments with clap, resolves the runtime context (config and
//! `.zmanim` directory), installs logging and dispatches to command handlers.

mod cli;
mod commands;
mod context;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use context::RuntimeContext;

fn main() {
    let cli = Cli::parse();

    let result = RuntimeContext::from_global_args(&cli.global).and_then(|ctx| {
        init_logging(&ctx);
        dispatch(&ctx, cli.command)
    });

    // Errors go to stderr as text or JSON; exit code 1 either way.
    if let Err(e) = result {
        if cli.global.json {
            let err_json = serde_json::json!({
                "error": format!("{:#}", e),
            });
            if let Ok(s) = serde_json::to_string_pretty(&err_json) {
                eprintln!("{}", s);
            }
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

/// `RUST_LOG` takes precedence over `--verbose` and the configured filter.
fn init_logging(ctx: &RuntimeContext) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(ctx.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn dispatch(ctx: &RuntimeContext, command: Option<Commands>) -> anyhow::Result<()> {
    match command {
        Some(Commands::Validate(args)) => commands::validate::run(ctx, &args),
        Some(Commands::Order(args)) => commands::order::run(ctx, &args),
        Some(Commands::Calc(args)) => commands::calc::run(ctx, &args),
        Some(Commands::Cache(args)) => commands::cache_cmd::run(ctx, &args),
        Some(Commands::Completion(args)) => commands::completion::run(ctx, &args),
        None => {
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
    }
}

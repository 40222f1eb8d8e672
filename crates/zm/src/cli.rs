//! Clap CLI definitions for the `zm` command.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// zm -- evaluate zmanim formulas.
#[derive(Parser, Debug)]
#[command(
    name = "zm",
    about = "Evaluate, validate and order zmanim formulas",
    long_about = "Parses a publisher's zmanim formulas, resolves references between them and \
                  evaluates one day's times against an ephemeris table.",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global flags available to all subcommands.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Output in JSON format.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging on stderr.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Config file (default: discover .zmanim/config.yaml upward from cwd).
    #[arg(long, global = true, env = "ZMANIM_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check one formula against a formula set without evaluating it.
    Validate(ValidateArgs),

    /// Print the order formulas would be evaluated in.
    Order(OrderArgs),

    /// Calculate one day of zmanim.
    #[command(alias = "calculate")]
    Calc(CalcArgs),

    /// Maintain the calculation cache.
    Cache(CacheArgs),

    /// Generate shell completions.
    Completion(CompletionArgs),
}

// ---------------------------------------------------------------------------
// Formula commands
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Key the formula would be saved under.
    pub key: String,

    /// Formula source, e.g. "@shkia + 42min".
    #[arg(allow_hyphen_values = true)]
    pub source: String,

    /// Formula set to check references and cycles against.
    #[arg(long, short = 'f')]
    pub formulas: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct OrderArgs {
    /// Formula set file (YAML, TOML or JSON).
    #[arg(long, short = 'f')]
    pub formulas: PathBuf,
}

#[derive(Args, Debug)]
pub struct CalcArgs {
    /// Formula set file (YAML, TOML or JSON).
    #[arg(long, short = 'f')]
    pub formulas: PathBuf,

    /// Ephemeris table (YAML or JSON) supplying the solar primitives.
    #[arg(long, short = 'e')]
    pub ephemeris: PathBuf,

    /// Civil date (YYYY-MM-DD).
    #[arg(long, short = 'd')]
    pub date: NaiveDate,

    /// Latitude in degrees, north positive.
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    /// Longitude in degrees, east positive.
    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,

    /// Elevation in meters.
    #[arg(long, default_value_t = 0.0)]
    pub elevation: f64,

    /// IANA timezone for display, e.g. Asia/Jerusalem.
    #[arg(long)]
    pub tz: String,

    /// Tag active on this date (repeatable).
    #[arg(long = "tag", short = 't')]
    pub tags: Vec<String>,

    /// Rounding override as KEY=MODE, MODE one of floor, math, ceil (repeatable).
    #[arg(long = "round", value_name = "KEY=MODE")]
    pub rounding: Vec<String>,

    /// Order by time-of-day category before time.
    #[arg(long)]
    pub category_order: bool,

    /// Publisher id; with --locality enables the calculation cache.
    #[arg(long, requires = "locality")]
    pub publisher: Option<String>,

    /// Locality id; with --publisher enables the calculation cache.
    #[arg(long, requires = "publisher")]
    pub locality: Option<String>,
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommands,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Drop cached days after a formula, tag or rounding change.
    Invalidate(InvalidateArgs),

    /// Remove expired entries.
    Purge,
}

#[derive(Args, Debug)]
pub struct InvalidateArgs {
    #[arg(long)]
    pub publisher: String,

    /// Limit to one locality of the publisher.
    #[arg(long)]
    pub locality: Option<String>,
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct CompletionArgs {
    /// Shell to generate completions for.
    #[arg(value_enum)]
    pub shell: Shell,
}

//! The zmanim formula language.
//!
//! Formulas are short arithmetic expressions over astronomical primitives,
//! durations and references to other formulas:
//!
//! ```text
//! alos            = solar(16.1, before_sunrise)
//! sof_zman_shma   = proportional_hours(3, gra)
//! plag            = @mincha_ketana + ((@shkia - @mincha_ketana) * 5 / 10)
//! candle_lighting = sunset - 18min
//! ```
//!
//! Pipeline: [`parse`] each source into a [`Node`], [`resolve`] the set into
//! a safe evaluation order, then [`evaluate`] each node against an
//! [`EvaluationContext`].

pub mod ast;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod resolver;

pub use ast::{Arg, BinOp, Builtin, DayBase, DayEdge, Horizon, Node};
pub use error::ParseError;
pub use eval::{EvalError, EvaluationContext, evaluate};
pub use parser::{MAX_NESTING, parse};
pub use resolver::{DependencyError, check_cycles_from, resolve};

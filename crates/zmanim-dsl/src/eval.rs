//! Evaluation of parsed formulas against a primitive provider.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Utc};
use tracing::debug;
use zmanim_astro::{PrimitiveProvider, ProviderError, SolarMode};
use zmanim_core::Location;

use crate::ast::{Arg, BAAL_HATANYA_ANGLE, BinOp, Builtin, DayBase, DayEdge, Horizon, Node};

/// Length of the day, in minutes, that `proportional_minutes` is stated
/// against.
const REFERENCE_DAY_MINUTES: f64 = 720.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("{primitive} has no crossing on {date}")]
    NoPrimitiveCrossing { primitive: String, date: NaiveDate },

    #[error("type mismatch in {operation}: got {found}")]
    TypeMismatch { operation: String, found: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("arithmetic overflow in {operation}")]
    Overflow { operation: String },

    #[error("day base ends before it starts ({start} .. {end})")]
    InvalidDayLength { start: DateTime<Utc>, end: DateTime<Utc> },

    #[error("referenced zman '@{reference}' failed to evaluate")]
    DependencyFailed { reference: String },

    /// A reference reached the evaluator before its target. The resolver
    /// prevents this; seeing it means the caller skipped resolution.
    #[error("internal error: '@{reference}' evaluated out of order")]
    MissingReference { reference: String },

    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),
}

impl EvalError {
    /// Errors that must abort the whole batch rather than one formula.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MissingReference { .. } | Self::ProviderUnavailable(_))
    }

    fn type_mismatch(operation: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            operation: operation.into(),
            found: found.into(),
        }
    }

    fn overflow(operation: impl Into<String>) -> Self {
        Self::Overflow {
            operation: operation.into(),
        }
    }
}

impl From<ProviderError> for EvalError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NoCrossing { primitive, date } => Self::NoPrimitiveCrossing { primitive, date },
            ProviderError::Unavailable(msg) => Self::ProviderUnavailable(msg),
        }
    }
}

/// Intermediate value of an expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Instant(DateTime<Utc>),
    Duration(TimeDelta),
    Number(f64),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Instant(_) => "instant",
            Self::Duration(_) => "duration",
            Self::Number(_) => "number",
        }
    }

    fn instant(self, operation: &str) -> Result<DateTime<Utc>, EvalError> {
        match self {
            Self::Instant(t) => Ok(t),
            other => Err(EvalError::type_mismatch(operation, other.kind())),
        }
    }

    fn number(self, operation: &str) -> Result<f64, EvalError> {
        match self {
            Self::Number(n) => Ok(n),
            other => Err(EvalError::type_mismatch(operation, other.kind())),
        }
    }
}

/// Per-batch evaluation state.
pub struct EvaluationContext<'a> {
    pub date: NaiveDate,
    pub location: &'a Location,
    provider: &'a dyn PrimitiveProvider,
    evaluated: HashMap<String, DateTime<Utc>>,
    failed: HashSet<String>,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(date: NaiveDate, location: &'a Location, provider: &'a dyn PrimitiveProvider) -> Self {
        Self {
            date,
            location,
            provider,
            evaluated: HashMap::new(),
            failed: HashSet::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<DateTime<Utc>> {
        self.evaluated.get(key).copied()
    }

    pub fn evaluated(&self) -> &HashMap<String, DateTime<Utc>> {
        &self.evaluated
    }

    /// Evaluate `node` as the formula `key` and record the outcome, so later
    /// references to `key` see either the instant or the failure.
    pub fn evaluate_formula(&mut self, key: &str, node: &Node) -> Result<DateTime<Utc>, EvalError> {
        match evaluate(node, self) {
            Ok(instant) => {
                self.evaluated.insert(key.to_string(), instant);
                Ok(instant)
            }
            Err(err) => {
                self.failed.insert(key.to_string());
                Err(err)
            }
        }
    }

    fn primitive(&self, builtin: Builtin) -> Result<DateTime<Utc>, EvalError> {
        self.primitive_on(builtin, self.date)
    }

    fn primitive_on(&self, builtin: Builtin, date: NaiveDate) -> Result<DateTime<Utc>, EvalError> {
        let loc = self.location;
        let instant = match builtin {
            Builtin::Sunrise => self.provider.sunrise(date, loc)?,
            Builtin::Sunset => self.provider.sunset(date, loc)?,
            Builtin::SolarNoon => self.provider.solar_noon(date, loc)?,
            Builtin::SolarMidnight => {
                let noon = self.provider.solar_noon(date, loc)?;
                noon.checked_sub_signed(TimeDelta::hours(12))
                    .ok_or_else(|| EvalError::overflow("solar_midnight"))?
            }
            other => match other.fixed_angle() {
                Some((angle, mode)) => self.provider.solar(angle, mode, date, loc)?,
                None => return Err(EvalError::type_mismatch(other.name(), "missing arguments")),
            },
        };
        Ok(instant)
    }

    /// Visible sunrise to sunset on `date`. Fails if the day has no length.
    fn visible_day(&self, date: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>, TimeDelta), EvalError> {
        let start = self.primitive_on(Builtin::Sunrise, date)?;
        let end = self.primitive_on(Builtin::Sunset, date)?;
        if end <= start {
            return Err(EvalError::InvalidDayLength { start, end });
        }
        Ok((start, end, end - start))
    }

    fn edge(&self, edge: DayEdge, date: NaiveDate) -> Result<DateTime<Utc>, EvalError> {
        let builtin = match (edge.side, edge.horizon) {
            (SolarMode::BeforeSunrise, Horizon::Visible) => Builtin::Sunrise,
            (SolarMode::AfterSunset, Horizon::Visible) => Builtin::Sunset,
            (SolarMode::BeforeSunrise, Horizon::Geometric) => Builtin::GeometricSunrise,
            (SolarMode::AfterSunset, Horizon::Geometric) => Builtin::GeometricSunset,
        };
        self.primitive_on(builtin, date)
    }
}

/// Move `anchor` by `offset` away from the day: earlier for a morning edge,
/// later for an evening one.
fn beyond(anchor: DateTime<Utc>, offset: TimeDelta, side: SolarMode, operation: &str) -> Result<DateTime<Utc>, EvalError> {
    match side {
        SolarMode::BeforeSunrise => anchor.checked_sub_signed(offset),
        SolarMode::AfterSunset => anchor.checked_add_signed(offset),
    }
    .ok_or_else(|| EvalError::overflow(operation))
}

/// Evaluate a formula tree to an instant.
///
/// Formulas must produce an instant; a bare duration or number at the top
/// level is a type mismatch.
pub fn evaluate(node: &Node, ctx: &mut EvaluationContext<'_>) -> Result<DateTime<Utc>, EvalError> {
    eval_value(node, ctx)?.instant("formula result")
}

fn eval_value(node: &Node, ctx: &mut EvaluationContext<'_>) -> Result<Value, EvalError> {
    match node {
        Node::Number(n) => Ok(Value::Number(*n)),
        Node::Duration(d) => Ok(Value::Duration(*d)),
        Node::Reference { key } => {
            if let Some(t) = ctx.get(key) {
                return Ok(Value::Instant(t));
            }
            if ctx.failed.contains(key) {
                return Err(EvalError::DependencyFailed { reference: key.clone() });
            }
            Err(EvalError::MissingReference { reference: key.clone() })
        }
        Node::BinaryOp { op, left, right } => {
            let l = eval_value(left, ctx)?;
            let r = eval_value(right, ctx)?;
            binary(*op, l, r)
        }
        Node::PrimitiveCall { name, args } => call(*name, args, ctx),
    }
}

fn expr_arg<'n>(name: Builtin, args: &'n [Arg], i: usize) -> Result<&'n Node, EvalError> {
    match args.get(i) {
        Some(Arg::Expr(node)) => Ok(node),
        _ => Err(EvalError::type_mismatch(name.name(), format!("argument {}", i + 1))),
    }
}

fn call(name: Builtin, args: &[Arg], ctx: &mut EvaluationContext<'_>) -> Result<Value, EvalError> {
    match name {
        Builtin::Solar => {
            let angle = eval_value(expr_arg(name, args, 0)?, ctx)?.number("solar angle")?;
            let mode = match args.get(1) {
                Some(Arg::Mode(m)) => *m,
                _ => return Err(EvalError::type_mismatch("solar mode", "argument 2")),
            };
            solar(angle, mode, ctx).map(Value::Instant)
        }
        Builtin::Midpoint | Builtin::EarlierOf | Builtin::LaterOf => {
            let a = eval_value(expr_arg(name, args, 0)?, ctx)?.instant(name.name())?;
            let b = eval_value(expr_arg(name, args, 1)?, ctx)?.instant(name.name())?;
            let t = match name {
                Builtin::EarlierOf => a.min(b),
                Builtin::LaterOf => a.max(b),
                _ => {
                    let half = scale(b - a, 0.5, "midpoint")?;
                    a.checked_add_signed(half).ok_or_else(|| EvalError::overflow("midpoint"))?
                }
            };
            Ok(Value::Instant(t))
        }
        Builtin::SeasonalSolar => {
            let angle = eval_value(expr_arg(name, args, 0)?, ctx)?.number("seasonal_solar angle")?;
            let edge = edge_arg(name, args)?;
            seasonal_solar(angle, edge, ctx).map(Value::Instant)
        }
        Builtin::ProportionalMinutes => {
            let minutes = eval_value(expr_arg(name, args, 0)?, ctx)?.number("proportional_minutes")?;
            let edge = edge_arg(name, args)?;
            let (_, _, day) = ctx.visible_day(ctx.date)?;
            let offset = scale(day, minutes / REFERENCE_DAY_MINUTES, "proportional_minutes")?;
            beyond(ctx.edge(edge, ctx.date)?, offset, edge.side, "proportional_minutes").map(Value::Instant)
        }
        Builtin::FirstValid => first_valid(args, ctx),
        Builtin::ProportionalHours => {
            let hours = eval_value(expr_arg(name, args, 0)?, ctx)?.number("proportional_hours")?;
            let (start, end) = match args.get(1) {
                Some(Arg::Base(base)) => day_bounds(base, ctx)?,
                _ => return Err(EvalError::type_mismatch("proportional_hours base", "argument 2")),
            };
            if end <= start {
                return Err(EvalError::InvalidDayLength { start, end });
            }
            let offset = scale(end - start, hours / 12.0, "proportional_hours")?;
            start
                .checked_add_signed(offset)
                .map(Value::Instant)
                .ok_or_else(|| EvalError::overflow("proportional_hours"))
        }
        primitive => ctx.primitive(primitive).map(Value::Instant),
    }
}

fn edge_arg(name: Builtin, args: &[Arg]) -> Result<DayEdge, EvalError> {
    match args.get(1) {
        Some(Arg::Edge(edge)) => Ok(*edge),
        _ => Err(EvalError::type_mismatch(format!("{name} direction"), "argument 2")),
    }
}

fn solar(angle: f64, mode: SolarMode, ctx: &EvaluationContext<'_>) -> Result<DateTime<Utc>, EvalError> {
    Ok(ctx.provider.solar(angle, mode, ctx.date, ctx.location)?)
}

/// Offset of the `angle` crossing from the day edge at the March equinox,
/// stretched by today's day length over the equinox day length.
fn seasonal_solar(angle: f64, edge: DayEdge, ctx: &EvaluationContext<'_>) -> Result<DateTime<Utc>, EvalError> {
    let equinox =
        NaiveDate::from_ymd_opt(ctx.date.year(), 3, 20).ok_or_else(|| EvalError::overflow("seasonal_solar equinox"))?;
    let reference = ctx.provider.solar(angle, edge.side, equinox, ctx.location)?;
    let equinox_offset = (ctx.edge(edge, equinox)? - reference).abs();

    let (_, _, equinox_day) = ctx.visible_day(equinox)?;
    let (_, _, today) = ctx.visible_day(ctx.date)?;
    let ratio = nanos(today, "seasonal_solar")? / nanos(equinox_day, "seasonal_solar")?;
    let offset = scale(equinox_offset, ratio, "seasonal_solar")?;
    beyond(ctx.edge(edge, ctx.date)?, offset, edge.side, "seasonal_solar")
}

/// Returns the first argument that evaluates without a per-formula error.
/// Fatal errors propagate immediately; if every argument fails, the last
/// argument's error is returned.
fn first_valid(args: &[Arg], ctx: &mut EvaluationContext<'_>) -> Result<Value, EvalError> {
    let mut last_err = EvalError::type_mismatch("first_valid", "no arguments");
    for (i, arg) in args.iter().enumerate() {
        let Arg::Expr(node) = arg else {
            return Err(EvalError::type_mismatch("first_valid", format!("argument {}", i + 1)));
        };
        match eval_value(node, ctx) {
            Ok(v) => return Ok(v),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                debug!(argument = i + 1, error = %e, "first_valid: trying next argument");
                last_err = e;
            }
        }
    }
    Err(last_err)
}

fn day_bounds(base: &DayBase, ctx: &mut EvaluationContext<'_>) -> Result<(DateTime<Utc>, DateTime<Utc>), EvalError> {
    match base {
        DayBase::Gra => Ok((ctx.primitive(Builtin::Sunrise)?, ctx.primitive(Builtin::Sunset)?)),
        DayBase::Mga { minutes } => {
            let pad = TimeDelta::minutes(i64::from(*minutes));
            let start = ctx.primitive(Builtin::Sunrise)?.checked_sub_signed(pad);
            let end = ctx.primitive(Builtin::Sunset)?.checked_add_signed(pad);
            start.zip(end).ok_or_else(|| EvalError::overflow("mga day base"))
        }
        DayBase::MgaZmanis { minutes } => {
            let (sunrise, sunset, day) = ctx.visible_day(ctx.date)?;
            let pad = scale(day, f64::from(*minutes) / REFERENCE_DAY_MINUTES, "mga zmanis day base")?;
            let start = beyond(sunrise, pad, SolarMode::BeforeSunrise, "mga zmanis day base")?;
            let end = beyond(sunset, pad, SolarMode::AfterSunset, "mga zmanis day base")?;
            Ok((start, end))
        }
        DayBase::MgaDegrees { degrees } => Ok((
            solar(*degrees, SolarMode::BeforeSunrise, ctx)?,
            solar(*degrees, SolarMode::AfterSunset, ctx)?,
        )),
        DayBase::BaalHatanya => Ok((
            solar(BAAL_HATANYA_ANGLE, SolarMode::BeforeSunrise, ctx)?,
            solar(BAAL_HATANYA_ANGLE, SolarMode::AfterSunset, ctx)?,
        )),
        DayBase::AteretTorah => {
            let end = ctx
                .primitive(Builtin::Sunset)?
                .checked_add_signed(TimeDelta::minutes(40))
                .ok_or_else(|| EvalError::overflow("ateret_torah day base"))?;
            Ok((ctx.primitive(Builtin::Sunrise)?, end))
        }
        DayBase::Custom { start, end } => {
            let s = eval_value(start, ctx)?.instant("custom start")?;
            let e = eval_value(end, ctx)?.instant("custom end")?;
            Ok((s, e))
        }
    }
}

fn nanos(d: TimeDelta, operation: &str) -> Result<f64, EvalError> {
    d.num_nanoseconds()
        .map(|n| n as f64)
        .ok_or_else(|| EvalError::overflow(operation))
}

/// Multiply a duration by a real factor, at nanosecond precision.
fn scale(d: TimeDelta, factor: f64, operation: &str) -> Result<TimeDelta, EvalError> {
    let scaled = (nanos(d, operation)? * factor).round();
    if !scaled.is_finite() || scaled.abs() >= i64::MAX as f64 {
        return Err(EvalError::overflow(operation));
    }
    Ok(TimeDelta::nanoseconds(scaled as i64))
}

fn binary(op: BinOp, l: Value, r: Value) -> Result<Value, EvalError> {
    use Value::{Duration, Instant, Number};

    let operation = || format!("{} {} {}", l.kind(), op, r.kind());
    let overflow = || EvalError::overflow(operation());

    match (op, l, r) {
        (BinOp::Add, Instant(t), Duration(d)) | (BinOp::Add, Duration(d), Instant(t)) => {
            t.checked_add_signed(d).map(Instant).ok_or_else(overflow)
        }
        (BinOp::Sub, Instant(t), Duration(d)) => t.checked_sub_signed(d).map(Instant).ok_or_else(overflow),
        (BinOp::Sub, Instant(a), Instant(b)) => Ok(Duration(a - b)),
        (BinOp::Add, Duration(a), Duration(b)) => a.checked_add(&b).map(Duration).ok_or_else(overflow),
        (BinOp::Sub, Duration(a), Duration(b)) => a.checked_sub(&b).map(Duration).ok_or_else(overflow),
        (BinOp::Mul, Duration(d), Number(n)) | (BinOp::Mul, Number(n), Duration(d)) => {
            scale(d, n, &operation()).map(Duration)
        }
        (BinOp::Div, Duration(d), Number(n)) => {
            if n == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            scale(d, 1.0 / n, &operation()).map(Duration)
        }
        (BinOp::Div, Duration(a), Duration(b)) => {
            let (a, b) = (a.num_nanoseconds(), b.num_nanoseconds());
            match (a, b) {
                (_, Some(0)) => Err(EvalError::DivisionByZero),
                (Some(a), Some(b)) => Ok(Number(a as f64 / b as f64)),
                _ => Err(overflow()),
            }
        }
        (BinOp::Div, Number(_), Number(b)) if b == 0.0 => Err(EvalError::DivisionByZero),
        (op, Number(a), Number(b)) => {
            let v = match op {
                BinOp::Add => a + b,
                BinOp::Sub => a - b,
                BinOp::Mul => a * b,
                BinOp::Div => a / b,
            };
            if v.is_finite() { Ok(Number(v)) } else { Err(overflow()) }
        }
        _ => Err(EvalError::type_mismatch(op.symbol(), operation())),
    }
}

//! Syntax tree for parsed formulas.
//!
//! Nodes are immutable once built. Two parses of the same source compare
//! equal.

use std::fmt;

use chrono::TimeDelta;
use zmanim_astro::SolarMode;

/// Built-in primitives and functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Sunrise,
    Sunset,
    GeometricSunrise,
    GeometricSunset,
    SolarNoon,
    SolarMidnight,
    CivilDawn,
    CivilDusk,
    NauticalDawn,
    NauticalDusk,
    AstronomicalDawn,
    AstronomicalDusk,
    Solar,
    SeasonalSolar,
    Midpoint,
    EarlierOf,
    LaterOf,
    FirstValid,
    ProportionalHours,
    ProportionalMinutes,
}

/// Number of arguments a built-in accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, n: usize) -> bool {
        match *self {
            Self::Exact(k) => n == k,
            Self::AtLeast(k) => n >= k,
        }
    }

    pub fn describe(&self) -> &'static str {
        match *self {
            Self::Exact(0) => "no",
            Self::Exact(2) => "exactly 2",
            Self::AtLeast(2) => "at least 2",
            Self::Exact(_) | Self::AtLeast(_) => "a fixed number of",
        }
    }
}

/// What an argument position accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Expr,
    Mode,
    Edge,
    Base,
}

impl ArgKind {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Expr => "an expression",
            Self::Mode => "a mode (before_sunrise, after_sunset)",
            Self::Edge => "a direction (before_sunrise, after_sunset, before_geometric_sunrise, after_geometric_sunset)",
            Self::Base => "a day base (gra, mga_*, mga_*_zmanis, baal_hatanya, ateret_torah, custom(start, end))",
        }
    }
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Self> {
        let b = match name {
            "sunrise" | "visible_sunrise" => Self::Sunrise,
            "sunset" | "visible_sunset" => Self::Sunset,
            "geometric_sunrise" => Self::GeometricSunrise,
            "geometric_sunset" => Self::GeometricSunset,
            "solar_noon" => Self::SolarNoon,
            "solar_midnight" => Self::SolarMidnight,
            "civil_dawn" => Self::CivilDawn,
            "civil_dusk" => Self::CivilDusk,
            "nautical_dawn" => Self::NauticalDawn,
            "nautical_dusk" => Self::NauticalDusk,
            "astronomical_dawn" => Self::AstronomicalDawn,
            "astronomical_dusk" => Self::AstronomicalDusk,
            "solar" => Self::Solar,
            "seasonal_solar" => Self::SeasonalSolar,
            "midpoint" => Self::Midpoint,
            "earlier_of" => Self::EarlierOf,
            "later_of" => Self::LaterOf,
            "first_valid" => Self::FirstValid,
            "proportional_hours" => Self::ProportionalHours,
            "proportional_minutes" => Self::ProportionalMinutes,
            _ => return None,
        };
        Some(b)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sunrise => "sunrise",
            Self::Sunset => "sunset",
            Self::GeometricSunrise => "geometric_sunrise",
            Self::GeometricSunset => "geometric_sunset",
            Self::SolarNoon => "solar_noon",
            Self::SolarMidnight => "solar_midnight",
            Self::CivilDawn => "civil_dawn",
            Self::CivilDusk => "civil_dusk",
            Self::NauticalDawn => "nautical_dawn",
            Self::NauticalDusk => "nautical_dusk",
            Self::AstronomicalDawn => "astronomical_dawn",
            Self::AstronomicalDusk => "astronomical_dusk",
            Self::Solar => "solar",
            Self::SeasonalSolar => "seasonal_solar",
            Self::Midpoint => "midpoint",
            Self::EarlierOf => "earlier_of",
            Self::LaterOf => "later_of",
            Self::FirstValid => "first_valid",
            Self::ProportionalHours => "proportional_hours",
            Self::ProportionalMinutes => "proportional_minutes",
        }
    }

    /// Zero-argument primitives that may be written without parentheses.
    pub fn is_bare(&self) -> bool {
        self.params().is_empty() && self.arity() == Arity::Exact(0)
    }

    pub fn arity(&self) -> Arity {
        match self {
            Self::FirstValid => Arity::AtLeast(2),
            _ => Arity::Exact(self.params().len()),
        }
    }

    /// Argument kinds by position. Variadic functions repeat the last kind.
    pub fn params(&self) -> &'static [ArgKind] {
        match self {
            Self::Solar => &[ArgKind::Expr, ArgKind::Mode],
            Self::SeasonalSolar | Self::ProportionalMinutes => &[ArgKind::Expr, ArgKind::Edge],
            Self::ProportionalHours => &[ArgKind::Expr, ArgKind::Base],
            Self::Midpoint | Self::EarlierOf | Self::LaterOf | Self::FirstValid => &[ArgKind::Expr, ArgKind::Expr],
            _ => &[],
        }
    }

    pub fn param_at(&self, position: usize) -> Option<ArgKind> {
        let params = self.params();
        match self.arity() {
            Arity::AtLeast(_) => params.get(position).or(params.last()).copied(),
            Arity::Exact(_) => params.get(position).copied(),
        }
    }

    /// Depression angle and side of the day for primitives defined by a
    /// fixed solar angle.
    pub fn fixed_angle(&self) -> Option<(f64, SolarMode)> {
        match self {
            Self::GeometricSunrise => Some((0.0, SolarMode::BeforeSunrise)),
            Self::GeometricSunset => Some((0.0, SolarMode::AfterSunset)),
            Self::CivilDawn => Some((6.0, SolarMode::BeforeSunrise)),
            Self::CivilDusk => Some((6.0, SolarMode::AfterSunset)),
            Self::NauticalDawn => Some((12.0, SolarMode::BeforeSunrise)),
            Self::NauticalDusk => Some((12.0, SolarMode::AfterSunset)),
            Self::AstronomicalDawn => Some((18.0, SolarMode::BeforeSunrise)),
            Self::AstronomicalDusk => Some((18.0, SolarMode::AfterSunset)),
            _ => None,
        }
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which horizon a day edge is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Horizon {
    /// Observed sunrise and sunset, with refraction.
    Visible,
    /// The sun's center on the geometric horizon.
    Geometric,
}

/// Sunrise or sunset, on a given horizon. Anchors `proportional_minutes` and
/// `seasonal_solar`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DayEdge {
    pub side: SolarMode,
    pub horizon: Horizon,
}

impl DayEdge {
    pub fn from_keyword(word: &str) -> Option<Self> {
        let (side, horizon) = match word {
            "before_sunrise" | "before_visible_sunrise" => (SolarMode::BeforeSunrise, Horizon::Visible),
            "after_sunset" | "after_visible_sunset" => (SolarMode::AfterSunset, Horizon::Visible),
            "before_geometric_sunrise" => (SolarMode::BeforeSunrise, Horizon::Geometric),
            "after_geometric_sunset" => (SolarMode::AfterSunset, Horizon::Geometric),
            _ => return None,
        };
        Some(Self { side, horizon })
    }
}

impl fmt::Display for DayEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match (self.side, self.horizon) {
            (SolarMode::BeforeSunrise, Horizon::Visible) => "before_sunrise",
            (SolarMode::AfterSunset, Horizon::Visible) => "after_sunset",
            (SolarMode::BeforeSunrise, Horizon::Geometric) => "before_geometric_sunrise",
            (SolarMode::AfterSunset, Horizon::Geometric) => "after_geometric_sunset",
        };
        f.write_str(word)
    }
}

/// Solar angle bounding the day for `baal_hatanya`.
pub const BAAL_HATANYA_ANGLE: f64 = 1.583;

/// Span of the day that `proportional_hours` divides into twelve.
#[derive(Debug, Clone, PartialEq)]
pub enum DayBase {
    /// Sunrise to sunset.
    Gra,
    /// `minutes` before sunrise to `minutes` after sunset.
    Mga { minutes: u32 },
    /// Like `Mga`, but the padding is `minutes` out of a 720-minute day,
    /// scaled to the actual sunrise-to-sunset length.
    MgaZmanis { minutes: u32 },
    /// From the morning to the evening crossing of `degrees` below the horizon.
    MgaDegrees { degrees: f64 },
    /// Crossings of [`BAAL_HATANYA_ANGLE`].
    BaalHatanya,
    /// Sunrise to 40 minutes after sunset.
    AteretTorah,
    Custom { start: Box<Node>, end: Box<Node> },
}

impl DayBase {
    pub fn from_keyword(word: &str) -> Option<Self> {
        let base = match word {
            "gra" => Self::Gra,
            "mga" | "mga_72" => Self::Mga { minutes: 72 },
            "mga_60" => Self::Mga { minutes: 60 },
            "mga_90" => Self::Mga { minutes: 90 },
            "mga_96" => Self::Mga { minutes: 96 },
            "mga_120" => Self::Mga { minutes: 120 },
            "mga_72_zmanis" => Self::MgaZmanis { minutes: 72 },
            "mga_90_zmanis" => Self::MgaZmanis { minutes: 90 },
            "mga_96_zmanis" => Self::MgaZmanis { minutes: 96 },
            "mga_16_1" => Self::MgaDegrees { degrees: 16.1 },
            "mga_18" => Self::MgaDegrees { degrees: 18.0 },
            "mga_19_8" => Self::MgaDegrees { degrees: 19.8 },
            "mga_26" => Self::MgaDegrees { degrees: 26.0 },
            "baal_hatanya" => Self::BaalHatanya,
            "ateret_torah" => Self::AteretTorah,
            _ => return None,
        };
        Some(base)
    }
}

impl fmt::Display for DayBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gra => f.write_str("gra"),
            Self::Mga { minutes } => write!(f, "mga_{minutes}"),
            Self::MgaZmanis { minutes } => write!(f, "mga_{minutes}_zmanis"),
            Self::MgaDegrees { degrees } => write!(f, "mga_{}", degrees.to_string().replace('.', "_")),
            Self::BaalHatanya => f.write_str("baal_hatanya"),
            Self::AteretTorah => f.write_str("ateret_torah"),
            Self::Custom { start, end } => write!(f, "custom({start}, {end})"),
        }
    }
}

/// One argument of a built-in call.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Expr(Node),
    Mode(SolarMode),
    Edge(DayEdge),
    Base(DayBase),
}

impl Arg {
    pub fn kind(&self) -> ArgKind {
        match self {
            Self::Expr(_) => ArgKind::Expr,
            Self::Mode(_) => ArgKind::Mode,
            Self::Edge(_) => ArgKind::Edge,
            Self::Base(_) => ArgKind::Base,
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expr(n) => n.fmt(f),
            Self::Mode(m) => m.fmt(f),
            Self::Edge(e) => e.fmt(f),
            Self::Base(b) => b.fmt(f),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Number(f64),
    Duration(TimeDelta),
    PrimitiveCall { name: Builtin, args: Vec<Arg> },
    Reference { key: String },
    BinaryOp { op: BinOp, left: Box<Node>, right: Box<Node> },
}

impl Node {
    /// Keys referenced with `@key`, in order of first appearance, without
    /// duplicates.
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Reference { key } => {
                if !out.contains(&key.as_str()) {
                    out.push(key);
                }
            }
            Self::BinaryOp { left, right, .. } => {
                left.collect_references(out);
                right.collect_references(out);
            }
            Self::PrimitiveCall { args, .. } => {
                for arg in args {
                    match arg {
                        Arg::Expr(n) => n.collect_references(out),
                        Arg::Base(DayBase::Custom { start, end }) => {
                            start.collect_references(out);
                            end.collect_references(out);
                        }
                        Arg::Mode(_) | Arg::Edge(_) | Arg::Base(_) => {}
                    }
                }
            }
            Self::Number(_) | Self::Duration(_) => {}
        }
    }
}

fn write_duration(f: &mut fmt::Formatter<'_>, d: TimeDelta) -> fmt::Result {
    let total = d.num_minutes();
    if total < 0 {
        f.write_str("-")?;
    }
    let (h, m) = (total.abs() / 60, total.abs() % 60);
    match (h, m) {
        (0, m) => write!(f, "{m}min"),
        (h, 0) => write!(f, "{h}h"),
        (h, m) => write!(f, "{h}h{m}min"),
    }
}

/// Canonical, fully parenthesized form. Parses back to an equal tree.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Duration(d) => write_duration(f, *d),
            Self::Reference { key } => write!(f, "@{key}"),
            Self::BinaryOp { op, left, right } => write!(f, "({left} {op} {right})"),
            Self::PrimitiveCall { name, args } if args.is_empty() && name.is_bare() => f.write_str(name.name()),
            Self::PrimitiveCall { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn reference(key: &str) -> Node {
        Node::Reference { key: key.into() }
    }

    #[test]
    fn references_are_deduplicated_in_order() {
        let node = Node::BinaryOp {
            op: BinOp::Add,
            left: Box::new(reference("b")),
            right: Box::new(Node::PrimitiveCall {
                name: Builtin::ProportionalHours,
                args: vec![
                    Arg::Expr(Node::Number(3.0)),
                    Arg::Base(DayBase::Custom {
                        start: Box::new(reference("a")),
                        end: Box::new(reference("b")),
                    }),
                ],
            }),
        };
        assert_eq!(node.references(), vec!["b", "a"]);
    }

    #[test]
    fn aliases_map_to_canonical_builtins() {
        assert_eq!(Builtin::from_name("visible_sunrise"), Some(Builtin::Sunrise));
        assert_eq!(Builtin::from_name("visible_sunset"), Some(Builtin::Sunset));
        assert_eq!(Builtin::from_name("geometric_sunset"), Some(Builtin::GeometricSunset));
        assert_eq!(Builtin::from_name("moonrise"), None);
    }

    #[test]
    fn signatures() {
        assert!(Builtin::Sunrise.is_bare());
        assert!(!Builtin::Solar.is_bare());
        assert!(Builtin::FirstValid.arity().accepts(5));
        assert!(!Builtin::FirstValid.arity().accepts(1));
        assert_eq!(Builtin::FirstValid.param_at(4), Some(ArgKind::Expr));
        assert_eq!(Builtin::Solar.param_at(1), Some(ArgKind::Mode));
        assert_eq!(Builtin::Solar.param_at(2), None);
        assert!(Builtin::GeometricSunrise.is_bare());
        assert_eq!(Builtin::ProportionalMinutes.param_at(1), Some(ArgKind::Edge));
        assert_eq!(Builtin::SeasonalSolar.param_at(1), Some(ArgKind::Edge));
        assert_eq!(Builtin::GeometricSunset.fixed_angle(), Some((0.0, SolarMode::AfterSunset)));
    }

    #[test]
    fn display_durations() {
        assert_eq!(Node::Duration(TimeDelta::minutes(75)).to_string(), "1h15min");
        assert_eq!(Node::Duration(TimeDelta::minutes(-18)).to_string(), "-18min");
        assert_eq!(Node::Duration(TimeDelta::minutes(180)).to_string(), "3h");
    }

    #[test]
    fn day_base_keywords() {
        assert_eq!(DayBase::from_keyword("mga"), Some(DayBase::Mga { minutes: 72 }));
        assert_eq!(DayBase::from_keyword("mga_120"), Some(DayBase::Mga { minutes: 120 }));
        assert_eq!(DayBase::from_keyword("baal_hatanya"), Some(DayBase::BaalHatanya));
        assert_eq!(DayBase::from_keyword("mga_96_zmanis"), Some(DayBase::MgaZmanis { minutes: 96 }));
        assert_eq!(DayBase::from_keyword("mga_21"), None);
        assert_eq!(DayBase::Mga { minutes: 90 }.to_string(), "mga_90");
        for word in [
            "mga_72_zmanis",
            "mga_16_1",
            "mga_18",
            "mga_19_8",
            "mga_26",
            "baal_hatanya",
            "ateret_torah",
        ] {
            assert_eq!(DayBase::from_keyword(word).map(|b| b.to_string()).as_deref(), Some(word));
        }
    }

    #[test]
    fn day_edge_keywords() {
        let morning = DayEdge {
            side: SolarMode::BeforeSunrise,
            horizon: Horizon::Visible,
        };
        assert_eq!(DayEdge::from_keyword("before_visible_sunrise"), Some(morning));
        assert_eq!(DayEdge::from_keyword("before_sunrise"), Some(morning));
        assert_eq!(morning.to_string(), "before_sunrise");
        assert_eq!(
            DayEdge::from_keyword("after_geometric_sunset").map(|e| e.to_string()).as_deref(),
            Some("after_geometric_sunset")
        );
        assert_eq!(DayEdge::from_keyword("after_noon"), None);
        assert_eq!(DayEdge::from_keyword("after_sunrise"), None);
    }
}

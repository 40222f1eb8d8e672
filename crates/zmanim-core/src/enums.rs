//! Enum types for the zmanim engine.
//!
//! [`TimeCategory`] is open-ended (publishers may invent buckets) and is built
//! with the `define_enum!` macro: known variants plus a catch-all
//! `Other(String)`, serialized as snake_case strings. [`RoundingMode`] is a
//! closed set.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Macro: defines an enum with known string variants + a custom fallback.
// ---------------------------------------------------------------------------
macro_rules! define_enum {
    (
        $(#[$meta:meta])*
        $name:ident, default = $default:ident, custom_variant = $custom_variant:ident,
        variants: [
            $( ($variant:ident, $str:expr) ),+ $(,)?
        ]
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $variant, )+
            $custom_variant(String),
        }

        impl $name {
            /// Returns the string representation.
            pub fn as_str(&self) -> &str {
                match self {
                    $( Self::$variant => $str, )+
                    Self::$custom_variant(s) => s.as_str(),
                }
            }

            /// Returns `true` if this is the default variant.
            pub fn is_default(&self) -> bool {
                *self == Self::$default
            }

            /// Returns `true` if this is a built-in (non-custom) variant.
            pub fn is_builtin(&self) -> bool {
                !matches!(self, Self::$custom_variant(_))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Ok(Self::from(s.as_str()))
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                match s {
                    $( $str => Self::$variant, )+
                    other => Self::$custom_variant(other.to_owned()),
                }
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                match s.as_str() {
                    $( $str => Self::$variant, )+
                    _ => Self::$custom_variant(s),
                }
            }
        }
    };
}

// ---------------------------------------------------------------------------
// TimeCategory
// ---------------------------------------------------------------------------

define_enum! {
    /// Coarse time-of-day bucket a zman belongs to.
    ///
    /// Used for grouping and as the tie-break / category-first key when
    /// ordering a calculated day.
    TimeCategory, default = Uncategorized, custom_variant = Other,
    variants: [
        (Dawn, "dawn"),
        (Sunrise, "sunrise"),
        (Morning, "morning"),
        (Midday, "midday"),
        (Afternoon, "afternoon"),
        (Sunset, "sunset"),
        (Nightfall, "nightfall"),
        (Midnight, "midnight"),
        (Uncategorized, "uncategorized"),
    ]
}

impl TimeCategory {
    /// Position in the fixed day sequence. Uncategorized and custom buckets
    /// sort after every known category.
    pub fn sort_order(&self) -> u8 {
        match self {
            Self::Dawn => 0,
            Self::Sunrise => 1,
            Self::Morning => 2,
            Self::Midday => 3,
            Self::Afternoon => 4,
            Self::Sunset => 5,
            Self::Nightfall => 6,
            Self::Midnight => 7,
            Self::Uncategorized | Self::Other(_) => 99,
        }
    }
}

// ---------------------------------------------------------------------------
// RoundingMode
// ---------------------------------------------------------------------------

/// Policy for turning an exact instant into a minute-granularity display time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoundingMode {
    /// Truncate to the minute at or before the instant.
    Floor,
    /// Nearest minute; 30 seconds and above round up.
    #[default]
    Math,
    /// Minute boundary at or after the instant (stringent positions).
    Ceil,
}

impl RoundingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Floor => "floor",
            Self::Math => "math",
            Self::Ceil => "ceil",
        }
    }
}

impl fmt::Display for RoundingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a rounding mode string is not one of floor/math/ceil.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown rounding mode '{0}' (expected floor, math or ceil)")]
pub struct UnknownRoundingMode(pub String);

impl FromStr for RoundingMode {
    type Err = UnknownRoundingMode;

    /// An empty string means "not configured" and maps to the default.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "math" => Ok(Self::Math),
            "floor" => Ok(Self::Floor),
            "ceil" => Ok(Self::Ceil),
            other => Err(UnknownRoundingMode(other.to_string())),
        }
    }
}

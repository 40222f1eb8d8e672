//! Core types for the zmanim formula engine.
//!
//! This crate holds the domain model shared by every other crate in the
//! workspace (formulas, tags, locations, calculated zmanim) together with the
//! pure post-processing steps of a calculation: rounding and formatting,
//! per-day visibility filtering, and display ordering.

pub mod enums;
pub mod formula;
pub mod formula_file;
pub mod location;
pub mod rounding;
pub mod sort;
pub mod visibility;
pub mod zman;

pub use enums::{RoundingMode, TimeCategory};
pub use formula::{Formula, FormulaSet, TagAssociation};
pub use location::{Location, LocationError};
pub use visibility::DayTagSet;
pub use zman::CalculatedZman;

//! The zmanim formula engine.
//!
//! [`calculate`] turns a publisher's formula set into an ordered day of
//! [`zmanim_core::CalculatedZman`] values for one date and location.
//! [`validate`] checks a single formula against a set without touching the
//! primitive provider. [`ZmanimService`] puts the cache facade in front of
//! `calculate`.

pub mod calculate;
pub mod error;
pub mod service;
pub mod validate;

#[cfg(test)]
mod test_support;

pub use calculate::{Calculation, CalculationRequest, FormulaFailure, calculate, evaluation_order};
pub use error::{EngineError, ValidationError};
pub use service::{ServiceResult, ZmanimService};
pub use validate::validate;

//! Astronomical primitives as an injectable capability.
//!
//! The engine never computes solar positions itself. It asks a
//! [`PrimitiveProvider`] for sunrise, sunset, solar noon and elevation-angle
//! crossings. This crate defines that seam, a memoizing decorator with a
//! pluggable [`PrimitiveCache`], and a [`TableProvider`] that serves
//! precomputed ephemeris tables.

pub mod caching;
pub mod provider;
pub mod table;

pub use caching::{CachingProvider, MemoryPrimitiveCache, Primitive, PrimitiveCache, PrimitiveKey};
pub use provider::{PrimitiveProvider, ProviderError, SolarMode};
pub use table::{EphemerisDay, EphemerisError, EphemerisTable, SolarCrossing, TableProvider};

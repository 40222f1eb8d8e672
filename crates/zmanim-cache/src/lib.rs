//! Caching of calculated zmanim per (publisher, locality, date).
//!
//! [`CacheFacade`] is what callers use: `get_or_compute` on the hot path and
//! `invalidate` after any mutation of formulas, tags or rounding modes. The
//! backing [`CacheStore`] is either process-local ([`MemoryStore`]) or a
//! SQLite file shared between runs ([`SqliteStore`]).

pub mod clock;
pub mod error;
pub mod facade;
pub mod key;
pub mod memory;
pub mod sqlite;
pub mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CacheError, Result};
pub use facade::{CacheFacade, CacheLookup, DEFAULT_TTL_HOURS, MAX_TTL_DAYS};
pub use key::{CacheEntry, CacheKey, InvalidationScope};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::CacheStore;

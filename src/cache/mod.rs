//! In-memory response caching.
//!
//! Only successful GET responses are stored. Entries are never persisted and
//! expire lazily on read (or in bulk via `purge_expired`).

pub mod response_cache;

pub use response_cache::{CacheEntry, CacheKey, ResponseCache};

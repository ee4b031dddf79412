//! An in-process key/value cache with per-entry expiration
//!
//! This crate provides a `LocalCache` that stores values under string keys
//! with an optional time-to-live. Expired entries are dropped lazily when a
//! read touches them and eagerly by a background sweeper task that runs on
//! the tokio runtime.

pub mod cache;
pub mod error;

pub use cache::{Cache, CacheConfig, Expiring, LocalCache, LocalCacheBuilder};
pub use error::CacheError;

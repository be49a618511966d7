//! In-memory cache of fetched wind datasets, keyed by viewport bounds.

pub mod bounds_cache;
pub mod config;

pub use bounds_cache::{BoundsCache, CacheEntry};
pub use config::CacheConfig;

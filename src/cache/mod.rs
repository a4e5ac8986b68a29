//! # Cache Module
//!
//! Read caching between the handlers and the data sources: a two-tier
//! cache (operator overrides over TTL-bounded entries) plus the
//! background sweeper that evicts expired entries.

pub mod sweeper;
pub mod tiered;

pub use sweeper::CacheSweeper;
pub use tiered::{CacheStats, TieredCache};

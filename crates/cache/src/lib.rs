//! File-backed, per-stage, TTL-bound caching of pipeline stage outputs.
//!
//! Caching is a performance optimization, never part of the pipeline's
//! correctness contract: corrupt or unreadable entries are treated as
//! misses and evicted, and write failures are logged and swallowed.

pub mod store;

pub use store::{CacheStats, PipelineCache};

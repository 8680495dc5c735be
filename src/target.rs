//! Target Layer
//!
//! One scheduler per monitored destination. Each target owns an independent
//! periodic loop spawned at construction, publishes its latest result plus
//! lifetime counters behind a read/write lock, and stops gracefully on
//! request. Two flavors share the design:
//!
//! - [`PingTarget`]: cycle dispatch bounded by a token pool
//! - [`TraceTarget`]: every tick dispatches unconditionally, so cycles may
//!   overlap when a cycle outlasts the interval

pub mod ping;
pub mod trace;

pub use ping::PingTarget;
pub use trace::TraceTarget;

/// Default bound on concurrently running ping cycles per target.
pub const MAX_CONCURRENT_JOBS: usize = 10;

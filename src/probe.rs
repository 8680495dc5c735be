//! Probe Layer
//!
//! Building blocks shared by the per-target schedulers: the process-wide ICMP
//! identifier allocator, the echo transport seam (with the production
//! `surge-ping` implementation), the ping statistics engine, and the hop
//! trace types plus their cumulative aggregation.
//!
//! # Architecture
//!
//! - [`IcmpIdAllocator`]: rotating 16-bit identifier source shared by all probes
//! - [`EchoTransport`]: one echo request/reply exchange, or a timeout
//! - [`run_ping`]: reduces a bounded attempt sequence into a [`PingResult`]
//! - [`HopTracer`]: one multi-hop trace per cycle, merged via [`merge_cycle`]

pub mod icmp;
mod id;
pub mod ping;
pub mod stats;
pub mod trace;

pub use icmp::{EchoReply, EchoTransport, ProbeError, SurgeTransport, resolve_host};
pub use id::IcmpIdAllocator;
pub use ping::{PingResult, run_ping};
pub use trace::{HopKey, HopSummary, HopTracer, TraceCycle, TraceHop, TraceResult, merge_cycle};

//! Netpulse - Network Reachability Monitor
//!
//! Periodically probes a set of configured targets with ICMP echo requests
//! (ping) and multi-hop traces, computes latency/loss statistics per cycle,
//! and keeps cumulative counters in memory for an exporting layer to read.
//!
//! # Architecture
//!
//! - **Probe**: identifier allocation, the echo transport seam, the ping
//!   statistics engine, and hop trace aggregation
//! - **Target**: one independently scheduled loop per monitored destination,
//!   publishing results behind a read/write lock
//! - **Config**: YAML target definitions with humantime durations
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use netpulse::config::PingTargetConfig;
//! use netpulse::probe::{IcmpIdAllocator, SurgeTransport};
//! use netpulse::target::PingTarget;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = Arc::new(SurgeTransport::new());
//! let id_alloc = Arc::new(IcmpIdAllocator::new());
//!
//! let config = PingTargetConfig::new("google-dns", "8.8.8.8")
//!     .with_interval(Duration::from_secs(30))
//!     .with_count(5);
//! let target = PingTarget::new(config, transport, id_alloc, Duration::ZERO).await?;
//!
//! let snapshot = target.compute().await;
//! println!("drop rate: {}", snapshot.drop_rate);
//! target.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod probe;
pub mod target;

pub use config::{AppConfig, ConfigError, PingTargetConfig, TraceTargetConfig};
pub use probe::{
    EchoReply, EchoTransport, HopSummary, HopTracer, IcmpIdAllocator, PingResult, ProbeError,
    SurgeTransport, TraceCycle, TraceHop, TraceResult,
};
pub use target::{MAX_CONCURRENT_JOBS, PingTarget, TraceTarget};

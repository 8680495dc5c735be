//! Hop trace types and cumulative aggregation.
//!
//! Path discovery itself lives behind the [`HopTracer`] trait; this module
//! defines the shape of one trace cycle and the additive merge that folds
//! successive cycles into running per-hop totals.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

use crate::probe::icmp::ProbeError;

/// One hop observed during a single trace cycle.
#[derive(Debug, Clone)]
pub struct TraceHop {
    /// Hop distance (the TTL at which this hop answered).
    pub ttl: u8,
    /// Address the probes left from.
    pub address_from: String,
    /// Address that answered at this distance.
    pub address_to: String,
    /// Probes sent to this hop in this cycle.
    pub snt: u64,
    /// Round-trip time summed over this cycle's answered probes.
    pub sum_time: Duration,
    /// Probes unanswered in this cycle.
    pub snt_fail: u64,
}

/// Output of one trace cycle.
#[derive(Debug, Clone, Default)]
pub struct TraceCycle {
    /// Destination the trace walked towards.
    pub dest_host: String,
    /// Hops in path order, one entry per responding (ttl, address) pair.
    pub hops: Vec<TraceHop>,
}

/// Identity of a hop across cycles: distance plus responding address.
///
/// A path change at the same distance produces a new key; the old entry
/// keeps its totals.
pub type HopKey = (u8, String);

/// Cumulative totals for one hop identity.
#[derive(Debug, Clone, Default)]
pub struct HopSummary {
    pub address_from: String,
    pub address_to: String,
    /// Lifetime probes sent to this hop.
    pub snt: u64,
    /// Lifetime round-trip time accumulated at this hop.
    pub snt_time: Duration,
    /// Lifetime probes unanswered by this hop.
    pub snt_fail: u64,
}

/// Latest trace cycle plus lifetime per-hop totals.
#[derive(Debug, Clone, Default)]
pub struct TraceResult {
    /// Hop list of the most recent cycle.
    pub hops: Vec<TraceHop>,
    /// Cumulative totals keyed by hop identity. Entries are never removed;
    /// a hop absent from a later cycle keeps its last known totals.
    pub hop_summary: HashMap<HopKey, HopSummary>,
}

/// Fold one trace cycle into the cumulative hop summary map.
///
/// Purely additive: existing keys gain this cycle's counters, unseen keys
/// are created, and keys missing from `cycle` are left untouched. Must be
/// called with exclusive access to the map (the owning target's write lock).
pub fn merge_cycle(summary: &mut HashMap<HopKey, HopSummary>, cycle: &TraceCycle) {
    for hop in &cycle.hops {
        let entry = summary
            .entry((hop.ttl, hop.address_to.clone()))
            .or_default();
        entry.address_from = hop.address_from.clone();
        entry.address_to = hop.address_to.clone();
        entry.snt += hop.snt;
        entry.snt_time += hop.sum_time;
        entry.snt_fail += hop.snt_fail;
    }
}

/// Produces one multi-hop trace per invocation.
///
/// Failures are wholesale: either the cycle yields a hop list or the whole
/// trace errored. The scheduler logs errors and publishes nothing for that
/// cycle.
#[async_trait::async_trait]
pub trait HopTracer: Send + Sync + 'static {
    async fn trace(
        &self,
        dest_host: &str,
        source: Option<IpAddr>,
        max_hops: u8,
        count: usize,
        timeout: Duration,
        identifier: u16,
    ) -> Result<TraceCycle, ProbeError>;
}

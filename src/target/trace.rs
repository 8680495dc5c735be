//! Trace-flavor target scheduler.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};

use crate::config::TraceTargetConfig;
use crate::probe::{HopTracer, IcmpIdAllocator, ProbeError, TraceResult, merge_cycle};

struct CycleState {
    name: String,
    host: String,
    source: Option<IpAddr>,
    max_hops: u8,
    count: usize,
    timeout: Duration,
    tracer: Arc<dyn HopTracer>,
    id_alloc: Arc<IcmpIdAllocator>,
    result: RwLock<TraceResult>,
}

/// A monitored trace destination with its own scheduling loop.
///
/// Unlike [`PingTarget`](crate::target::PingTarget), every tick dispatches a
/// new cycle unconditionally: when a trace outlasts the interval, cycles
/// overlap. The cumulative hop summary stays correct under any interleaving
/// because each cycle's merge only ever adds its own counters.
pub struct TraceTarget {
    labels: BTreeMap<String, String>,
    state: Arc<CycleState>,
    stop: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TraceTarget {
    /// Start the scheduling loop for one trace destination.
    ///
    /// The tracer resolves the host itself each cycle, so construction only
    /// validates the optional source address.
    ///
    /// # Errors
    ///
    /// Fails when the configured source address is not a valid IP literal.
    pub fn new(
        config: TraceTargetConfig,
        tracer: Arc<dyn HopTracer>,
        id_alloc: Arc<IcmpIdAllocator>,
        startup_delay: Duration,
    ) -> Result<Self, ProbeError> {
        let source = match &config.source {
            Some(addr) => Some(
                addr.parse::<IpAddr>()
                    .map_err(|_| ProbeError::Resolve(addr.clone()))?,
            ),
            None => None,
        };

        let state = Arc::new(CycleState {
            name: config.name,
            host: config.host,
            source,
            max_hops: config.max_hops,
            count: config.count,
            timeout: config.timeout,
            tracer,
            id_alloc,
            result: RwLock::new(TraceResult::default()),
        });

        let (stop, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run(
            Arc::clone(&state),
            stop_rx,
            startup_delay,
            config.interval,
        ));

        Ok(Self {
            labels: config.labels,
            state,
            stop,
            handle: Mutex::new(Some(handle)),
        })
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    pub fn host(&self) -> &str {
        &self.state.host
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    /// Snapshot of the latest hop list and the cumulative per-hop summary.
    pub async fn compute(&self) -> TraceResult {
        self.state.result.read().await.clone()
    }

    /// Signal the scheduling loop and wait for it to exit.
    ///
    /// Dispatched cycles are not awaited; a late merge after `stop` returns
    /// is harmless.
    pub async fn stop(&self) {
        let _ = self.stop.send(true);
        if let Some(handle) = self.handle.lock().await.take() {
            let _ = handle.await;
        }
    }
}

impl std::fmt::Debug for TraceTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceTarget")
            .field("name", &self.state.name)
            .field("host", &self.state.host)
            .finish_non_exhaustive()
    }
}

async fn run(
    state: Arc<CycleState>,
    mut stop: watch::Receiver<bool>,
    startup_delay: Duration,
    interval: Duration,
) {
    if !startup_delay.is_zero() {
        tokio::select! {
            _ = sleep(startup_delay) => {}
            _ = stop.changed() => return,
        }
    }

    let mut tick = interval_at(Instant::now() + interval, interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = stop.changed() => return,
            _ = tick.tick() => {
                let state = Arc::clone(&state);
                tokio::spawn(trace_cycle(state));
            }
        }
    }
}

/// One trace cycle: walk the path, then merge under the write lock.
async fn trace_cycle(state: Arc<CycleState>) {
    let identifier = state.id_alloc.next();
    let cycle = state
        .tracer
        .trace(
            &state.host,
            state.source,
            state.max_hops,
            state.count,
            state.timeout,
            identifier,
        )
        .await;

    match cycle {
        Ok(cycle) => {
            tracing::debug!(
                name = %state.name,
                host = %state.host,
                identifier,
                hops = cycle.hops.len(),
                "Trace cycle complete"
            );
            let mut result = state.result.write().await;
            merge_cycle(&mut result.hop_summary, &cycle);
            result.hops = cycle.hops;
        }
        Err(e) => {
            tracing::error!(name = %state.name, host = %state.host, error = %e, "Trace cycle failed");
        }
    }
}

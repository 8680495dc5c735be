//! Ping-flavor target scheduler.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock, Semaphore, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};

use crate::config::PingTargetConfig;
use crate::probe::{EchoTransport, IcmpIdAllocator, PingResult, ProbeError, resolve_host, run_ping};

/// State shared between the scheduling loop and its spawned cycles.
struct CycleState {
    name: String,
    ip: IpAddr,
    source: Option<IpAddr>,
    count: usize,
    interval: Duration,
    timeout: Duration,
    transport: Arc<dyn EchoTransport>,
    id_alloc: Arc<IcmpIdAllocator>,
    result: RwLock<PingResult>,
}

/// A monitored ping destination with its own scheduling loop.
///
/// Construction resolves the destination and spawns the loop; the handle
/// stays live while the loop runs in the background. Cycle dispatch is
/// bounded by a token pool of `max_concurrent_jobs`: a tick whose pool is
/// exhausted blocks dispatch until a running cycle finishes.
///
/// [`stop`](PingTarget::stop) signals the loop and joins it, but does not
/// drain cycles already dispatched; a late cycle may still publish its
/// result after `stop` returns, which the additive counters tolerate.
pub struct PingTarget {
    host: String,
    labels: BTreeMap<String, String>,
    state: Arc<CycleState>,
    stop: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl PingTarget {
    /// Resolve the destination and start the scheduling loop.
    ///
    /// `startup_delay` staggers the first tick so that many targets sharing
    /// one interval do not probe in lockstep; an early [`stop`](Self::stop)
    /// interrupts the delay.
    ///
    /// # Errors
    ///
    /// Fails when the configured host or source address cannot be resolved;
    /// no loop is started in that case.
    pub async fn new(
        config: PingTargetConfig,
        transport: Arc<dyn EchoTransport>,
        id_alloc: Arc<IcmpIdAllocator>,
        startup_delay: Duration,
    ) -> Result<Self, ProbeError> {
        let ip = resolve_host(&config.host).await?;
        let source = match &config.source {
            Some(addr) => Some(
                addr.parse::<IpAddr>()
                    .map_err(|_| ProbeError::Resolve(addr.clone()))?,
            ),
            None => None,
        };

        let state = Arc::new(CycleState {
            name: config.name,
            ip,
            source,
            count: config.count,
            interval: config.interval,
            timeout: config.timeout,
            transport,
            id_alloc,
            result: RwLock::new(PingResult::default()),
        });

        let (stop, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run(
            Arc::clone(&state),
            stop_rx,
            startup_delay,
            config.max_concurrent_jobs,
        ));

        Ok(Self {
            host: config.host,
            labels: config.labels,
            state,
            stop,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Target name.
    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// Configured host (name or address literal).
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Resolved destination address.
    pub fn ip(&self) -> IpAddr {
        self.state.ip
    }

    /// Static labels attached to this target.
    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    /// Snapshot of the latest result and lifetime counters.
    ///
    /// Returns an empty-but-valid result until the first cycle completes.
    pub async fn compute(&self) -> PingResult {
        self.state.result.read().await.clone()
    }

    /// Signal the scheduling loop and wait for it to exit.
    ///
    /// Safe against a loop that has not ticked yet. Cycles already
    /// dispatched are not awaited.
    pub async fn stop(&self) {
        let _ = self.stop.send(true);
        if let Some(handle) = self.handle.lock().await.take() {
            let _ = handle.await;
        }
    }
}

impl std::fmt::Debug for PingTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PingTarget")
            .field("name", &self.state.name)
            .field("host", &self.host)
            .field("ip", &self.state.ip)
            .finish_non_exhaustive()
    }
}

async fn run(
    state: Arc<CycleState>,
    mut stop: watch::Receiver<bool>,
    startup_delay: Duration,
    max_concurrent: usize,
) {
    if !startup_delay.is_zero() {
        tokio::select! {
            _ = sleep(startup_delay) => {}
            _ = stop.changed() => return,
        }
    }

    let limiter = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut tick = interval_at(Instant::now() + state.interval, state.interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = stop.changed() => return,
            _ = tick.tick() => {
                // Full pool: dispatch of this tick blocks until a cycle
                // releases its token.
                let Ok(permit) = Arc::clone(&limiter).acquire_owned().await else {
                    return;
                };
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    ping_cycle(state).await;
                    drop(permit);
                });
            }
        }
    }
}

/// One probe cycle: run the engine, then publish under the write lock.
///
/// Never propagates an error to the loop; a cycle in which every attempt is
/// lost publishes a 100%-loss result for the period.
async fn ping_cycle(state: Arc<CycleState>) {
    let identifier = state.id_alloc.next();
    let mut cycle = run_ping(
        state.transport.as_ref(),
        state.ip,
        state.source,
        state.count,
        state.interval,
        state.timeout,
        identifier,
    )
    .await;

    if cycle.success {
        tracing::debug!(
            name = %state.name,
            ip = %state.ip,
            identifier,
            drop_rate = cycle.drop_rate,
            avg_us = cycle.avg_time.as_micros() as u64,
            best_us = cycle.best_time.as_micros() as u64,
            worst_us = cycle.worst_time.as_micros() as u64,
            "Ping cycle complete"
        );
    } else {
        tracing::warn!(
            name = %state.name,
            ip = %state.ip,
            identifier,
            attempts = state.count,
            "Ping cycle completed without replies"
        );
    }

    let mut result = state.result.write().await;
    cycle.accumulate(&result);
    *result = cycle;
}

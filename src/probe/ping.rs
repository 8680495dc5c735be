//! Ping statistics engine.
//!
//! Drives a bounded sequence of echo attempts against one destination and
//! reduces the outcomes into per-cycle latency and loss statistics. Lost
//! packets are never errors here: they only raise the drop rate.

use std::net::IpAddr;
use std::time::Duration;

use crate::probe::icmp::EchoTransport;
use crate::probe::stats;

/// Statistics of one ping cycle, plus lifetime counters.
///
/// Per-cycle fields are replaced wholesale each cycle; the three `snt_*`
/// summary counters accumulate across the owning target's lifetime and are
/// monotonically non-decreasing.
#[derive(Debug, Clone, Default)]
pub struct PingResult {
    /// Destination the cycle probed.
    pub dest_ip: Option<IpAddr>,
    /// At least one attempt got a matching reply.
    pub success: bool,
    /// Fraction of attempts unanswered, in [0, 1].
    pub drop_rate: f64,
    /// Fastest round trip of the cycle.
    pub best_time: Duration,
    /// Slowest round trip of the cycle.
    pub worst_time: Duration,
    /// Mean round trip (microsecond precision).
    pub avg_time: Duration,
    /// Sum of all successful round trips.
    pub sum_time: Duration,
    /// Population variance of the samples, in seconds squared.
    pub squared_deviation: f64,
    /// Standard deviation, population form.
    pub uncorrected_sd_time: Duration,
    /// Standard deviation with Bessel's correction; zero below 2 samples.
    pub corrected_sd_time: Duration,
    /// Worst minus best sample.
    pub range_time: Duration,
    /// Lifetime attempts sent.
    pub snt_summary: u64,
    /// Lifetime attempts unanswered.
    pub snt_fail_summary: u64,
    /// Lifetime round-trip time accumulated over successful attempts.
    pub snt_time_summary: Duration,
}

impl PingResult {
    /// Fold the previous result's lifetime counters into this one.
    ///
    /// Called under the target's write lock before this result replaces the
    /// previous one, keeping the summary counters monotonic.
    pub fn accumulate(&mut self, prev: &PingResult) {
        self.snt_summary += prev.snt_summary;
        self.snt_fail_summary += prev.snt_fail_summary;
        self.snt_time_summary += prev.snt_time_summary;
    }
}

/// Run one ping cycle of `count` echo attempts.
///
/// Attempts that error, time out, or are answered by an address other than
/// `dest` record no sample and do not advance the sequence number; the cycle
/// continues either way, sleeping `interval` between attempts. The returned
/// summary counters carry this cycle's contribution only.
pub async fn run_ping(
    transport: &dyn EchoTransport,
    dest: IpAddr,
    source: Option<IpAddr>,
    count: usize,
    interval: Duration,
    timeout: Duration,
    identifier: u16,
) -> PingResult {
    let mut samples: Vec<Duration> = Vec::with_capacity(count);
    let mut result = PingResult {
        dest_ip: Some(dest),
        ..PingResult::default()
    };

    let mut sequence: u16 = 0;
    for attempt in 0..count {
        let reply = transport
            .send_echo(dest, source, None, identifier, timeout, sequence)
            .await;

        match reply {
            Ok(reply) if reply.success && reply.responder == Some(dest) => {
                let elapsed = reply.elapsed;
                samples.push(elapsed);

                if result.worst_time.is_zero() || elapsed > result.worst_time {
                    result.worst_time = elapsed;
                }
                if result.best_time.is_zero() || elapsed < result.best_time {
                    result.best_time = elapsed;
                }
                result.sum_time += elapsed;
                result.avg_time = Duration::from_micros(
                    result.sum_time.as_micros() as u64 / samples.len() as u64,
                );
                result.success = true;

                // Quirk kept from the reference behavior: the sequence
                // number advances only when an attempt succeeds.
                sequence = sequence.wrapping_add(1);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(dest = %dest, attempt, error = %e, "Echo transport unusable");
            }
        }

        if attempt + 1 < count {
            tokio::time::sleep(interval).await;
        }
    }

    result.drop_rate = (count - samples.len()) as f64 / count as f64;
    result.squared_deviation = stats::squared_deviation(&samples);
    result.uncorrected_sd_time = stats::uncorrected_deviation(&samples);
    result.corrected_sd_time = stats::corrected_deviation(&samples);
    result.range_time = stats::range(&samples);
    result.snt_summary = count as u64;
    result.snt_fail_summary = (count - samples.len()) as u64;
    result.snt_time_summary = result.sum_time;

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::icmp::{EchoReply, ProbeError};
    use std::net::Ipv4Addr;
    use std::sync::Mutex;

    const DEST: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1));

    /// Transport that replays a scripted list of replies and records the
    /// sequence numbers it was handed.
    struct ScriptedTransport {
        replies: Mutex<std::vec::IntoIter<EchoReply>>,
        sequences: Mutex<Vec<u16>>,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<EchoReply>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter()),
                sequences: Mutex::new(Vec::new()),
            }
        }

        fn ok(elapsed: Duration) -> EchoReply {
            EchoReply {
                success: true,
                responder: Some(DEST),
                elapsed,
            }
        }

        fn sequences(&self) -> Vec<u16> {
            self.sequences.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl EchoTransport for ScriptedTransport {
        async fn send_echo(
            &self,
            _dest: IpAddr,
            _source: Option<IpAddr>,
            _ttl: Option<u32>,
            _identifier: u16,
            _timeout: Duration,
            sequence: u16,
        ) -> Result<EchoReply, ProbeError> {
            self.sequences.lock().unwrap().push(sequence);
            Ok(self
                .replies
                .lock()
                .unwrap()
                .next()
                .unwrap_or_else(EchoReply::lost))
        }
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[tokio::test]
    async fn test_all_success_fixed_latency() {
        let transport = ScriptedTransport::new(vec![ScriptedTransport::ok(ms(10)); 4]);
        let result = run_ping(&transport, DEST, None, 4, Duration::ZERO, ms(100), 7).await;

        assert!(result.success);
        assert_eq!(result.drop_rate, 0.0);
        assert_eq!(result.best_time, ms(10));
        assert_eq!(result.worst_time, ms(10));
        assert_eq!(result.avg_time, ms(10));
        assert_eq!(result.sum_time, ms(40));
        assert_eq!(result.squared_deviation, 0.0);
        assert_eq!(result.uncorrected_sd_time, Duration::ZERO);
        assert_eq!(result.corrected_sd_time, Duration::ZERO);
        assert_eq!(result.range_time, Duration::ZERO);
        assert_eq!(result.snt_summary, 4);
        assert_eq!(result.snt_fail_summary, 0);
        assert_eq!(result.snt_time_summary, ms(40));
    }

    #[tokio::test]
    async fn test_partial_loss_drop_rate_exact() {
        let transport = ScriptedTransport::new(vec![
            ScriptedTransport::ok(ms(10)),
            EchoReply::lost(),
            ScriptedTransport::ok(ms(30)),
            EchoReply::lost(),
        ]);
        let result = run_ping(&transport, DEST, None, 4, Duration::ZERO, ms(100), 1).await;

        assert!(result.success);
        assert_eq!(result.drop_rate, 0.5);
        assert_eq!(result.best_time, ms(10));
        assert_eq!(result.worst_time, ms(30));
        assert_eq!(result.avg_time, ms(20));
        assert_eq!(result.snt_fail_summary, 2);
    }

    #[tokio::test]
    async fn test_all_lost_returns_normally() {
        let transport = ScriptedTransport::new(vec![EchoReply::lost(); 3]);
        let result = run_ping(&transport, DEST, None, 3, Duration::ZERO, ms(100), 1).await;

        assert!(!result.success);
        assert_eq!(result.drop_rate, 1.0);
        assert_eq!(result.best_time, Duration::ZERO);
        assert_eq!(result.avg_time, Duration::ZERO);
        assert_eq!(result.snt_summary, 3);
        assert_eq!(result.snt_fail_summary, 3);
    }

    #[tokio::test]
    async fn test_sequence_advances_only_on_success() {
        // fail, succeed, fail, succeed -> sequences sent: 0, 0, 1, 1
        let transport = ScriptedTransport::new(vec![
            EchoReply::lost(),
            ScriptedTransport::ok(ms(5)),
            EchoReply::lost(),
            ScriptedTransport::ok(ms(5)),
        ]);
        run_ping(&transport, DEST, None, 4, Duration::ZERO, ms(100), 1).await;

        assert_eq!(transport.sequences(), vec![0, 0, 1, 1]);
    }

    #[tokio::test]
    async fn test_mismatched_responder_counts_as_lost() {
        let stray = EchoReply {
            success: true,
            responder: Some(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9))),
            elapsed: ms(2),
        };
        let transport = ScriptedTransport::new(vec![stray, ScriptedTransport::ok(ms(8))]);
        let result = run_ping(&transport, DEST, None, 2, Duration::ZERO, ms(100), 1).await;

        assert_eq!(result.drop_rate, 0.5);
        assert_eq!(result.best_time, ms(8));
        // The stray reply must not advance the sequence number.
        assert_eq!(transport.sequences(), vec![0, 0]);
    }

    #[tokio::test]
    async fn test_dispersion_over_known_samples() {
        let transport = ScriptedTransport::new(vec![
            ScriptedTransport::ok(ms(10)),
            ScriptedTransport::ok(ms(20)),
            ScriptedTransport::ok(ms(30)),
        ]);
        let result = run_ping(&transport, DEST, None, 3, Duration::ZERO, ms(100), 1).await;

        assert_eq!(result.avg_time, ms(20));
        let pop_var_ms2 = result.squared_deviation * 1e6;
        assert!((pop_var_ms2 - 200.0 / 3.0).abs() < 1e-6);
        let corrected_ms = result.corrected_sd_time.as_secs_f64() * 1e3;
        assert!((corrected_ms - 10.0).abs() < 1e-6);
        assert_eq!(result.range_time, ms(20));
    }

    #[test]
    fn test_accumulate_is_monotonic() {
        let mut prev = PingResult::default();
        for cycle in 0..5u64 {
            let mut next = PingResult {
                snt_summary: 3,
                snt_fail_summary: cycle % 2,
                snt_time_summary: ms(30),
                ..PingResult::default()
            };
            next.accumulate(&prev);
            assert!(next.snt_summary >= prev.snt_summary);
            assert!(next.snt_fail_summary >= prev.snt_fail_summary);
            assert!(next.snt_time_summary >= prev.snt_time_summary);
            prev = next;
        }
        assert_eq!(prev.snt_summary, 15);
    }
}

//! Echo transport seam and its `surge-ping` implementation.
//!
//! The schedulers and the ping engine never talk to raw sockets directly;
//! they go through [`EchoTransport`], which performs one echo request/reply
//! exchange. Tests substitute a scripted fake behind the same trait.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use surge_ping::{Client, Config, ICMP, IcmpPacket, PingIdentifier, PingSequence};
use thiserror::Error;
use tokio::time::timeout;

/// Errors surfaced by the probe layer.
///
/// Individual lost packets are not errors; they show up as unanswered
/// attempts in the statistics. These variants cover the cases where a whole
/// cycle cannot run: an unresolvable destination or an unusable transport.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Network I/O error.
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    /// Destination host could not be resolved.
    #[error("failed to resolve '{0}'")]
    Resolve(String),

    /// The ICMP client could not be created (typically missing privileges).
    #[error("icmp client unavailable: {0}")]
    Client(String),

    /// The hop trace collaborator failed for an entire cycle.
    #[error("trace failed: {0}")]
    Trace(String),
}

/// Outcome of one echo attempt.
#[derive(Debug, Clone)]
pub struct EchoReply {
    /// Whether a reply arrived before the timeout.
    pub success: bool,
    /// Address the reply came from, when one arrived.
    pub responder: Option<IpAddr>,
    /// Round-trip time of the reply; zero when none arrived.
    pub elapsed: Duration,
}

impl EchoReply {
    /// An attempt that got no usable reply.
    pub fn lost() -> Self {
        Self {
            success: false,
            responder: None,
            elapsed: Duration::ZERO,
        }
    }
}

/// One ICMP echo request/reply exchange.
///
/// Implementations must never block longer than `timeout`; a timeout,
/// network error, or protocol failure is reported as a lost reply, not as
/// an `Err`. `Err` is reserved for a transport that cannot operate at all.
#[async_trait::async_trait]
pub trait EchoTransport: Send + Sync + 'static {
    /// Send one echo to `dest` and wait for the matching reply.
    ///
    /// `ttl` of `None` means the OS default (full path). `identifier` and
    /// `sequence` correlate the reply on the shared raw socket.
    async fn send_echo(
        &self,
        dest: IpAddr,
        source: Option<IpAddr>,
        ttl: Option<u32>,
        identifier: u16,
        timeout: Duration,
        sequence: u16,
    ) -> Result<EchoReply, ProbeError>;
}

/// Production transport backed by `surge-ping`.
///
/// A client is created per exchange, keyed off the destination IP version,
/// so IPv4 and IPv6 targets can be mixed freely.
#[derive(Debug, Default)]
pub struct SurgeTransport;

impl SurgeTransport {
    pub fn new() -> Self {
        Self
    }

    fn client_for(
        dest: IpAddr,
        source: Option<IpAddr>,
        ttl: Option<u32>,
    ) -> Result<Client, ProbeError> {
        let mut builder = Config::builder();
        if let IpAddr::V6(_) = dest {
            builder = builder.kind(ICMP::V6);
        }
        if let Some(src) = source {
            builder = builder.bind(SocketAddr::new(src, 0));
        }
        if let Some(ttl) = ttl {
            builder = builder.ttl(ttl);
        }
        Client::new(&builder.build()).map_err(|e| ProbeError::Client(e.to_string()))
    }
}

#[async_trait::async_trait]
impl EchoTransport for SurgeTransport {
    async fn send_echo(
        &self,
        dest: IpAddr,
        source: Option<IpAddr>,
        ttl: Option<u32>,
        identifier: u16,
        probe_timeout: Duration,
        sequence: u16,
    ) -> Result<EchoReply, ProbeError> {
        let client = Self::client_for(dest, source, ttl)?;
        let mut pinger = client.pinger(dest, PingIdentifier(identifier)).await;
        pinger.timeout(probe_timeout);

        // The pinger enforces its own timeout; the outer one guards against
        // the reply task stalling.
        let result = timeout(probe_timeout, pinger.ping(PingSequence(sequence), &[])).await;

        match result {
            Ok(Ok((packet, rtt))) => {
                let responder = match &packet {
                    IcmpPacket::V4(reply) => IpAddr::V4(reply.get_source()),
                    IcmpPacket::V6(reply) => IpAddr::V6(reply.get_source()),
                };
                Ok(EchoReply {
                    success: true,
                    responder: Some(responder),
                    elapsed: rtt,
                })
            }
            Ok(Err(e)) => {
                tracing::debug!(dest = %dest, sequence, error = %e, "Echo attempt failed");
                Ok(EchoReply::lost())
            }
            Err(_) => Ok(EchoReply::lost()),
        }
    }
}

/// Resolve a hostname or IP literal to an IP address.
pub async fn resolve_host(host: &str) -> Result<IpAddr, ProbeError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }

    let addrs = tokio::net::lookup_host(format!("{host}:0")).await?;
    addrs
        .into_iter()
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| ProbeError::Resolve(host.to_string()))
}

//! Netpulse Binary Entry Point
//!
//! Loads the target configuration, starts one scheduling loop per target,
//! and periodically logs result snapshots until shutdown. Metrics export
//! belongs to a separate layer; the log report stands in for it here.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use rand::Rng;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use netpulse::config::{AppConfig, parse_duration};
use netpulse::probe::{IcmpIdAllocator, SurgeTransport};
use netpulse::target::PingTarget;

/// Netpulse - Network Reachability Monitor
#[derive(Parser, Debug)]
#[command(name = "netpulse", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "configs/config.yaml",
        env = "NETPULSE_CONFIG"
    )]
    config: String,

    /// Interval between logged result reports
    #[arg(long, default_value = "60s", env = "NETPULSE_REPORT_INTERVAL", value_parser = parse_duration)]
    report_interval: Duration,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,netpulse=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Netpulse - Network Reachability Monitor");

    let cli = Cli::parse();

    tracing::info!("Loading configuration from: {}", cli.config);
    let config = AppConfig::load(&cli.config)?;
    config.validate()?;

    let transport = Arc::new(SurgeTransport::new());
    let id_alloc = Arc::new(IcmpIdAllocator::new());

    let mut targets: Vec<Arc<PingTarget>> = Vec::new();
    for target_config in config.ping.iter().cloned() {
        if !target_config.enabled {
            tracing::debug!("Skipping disabled target: {}", target_config.name);
            continue;
        }

        let startup_delay = stagger_delay(config.startup_stagger);
        let name = target_config.name.clone();
        match PingTarget::new(
            target_config,
            transport.clone(),
            id_alloc.clone(),
            startup_delay,
        )
        .await
        {
            Ok(target) => {
                tracing::info!(
                    name = %target.name(),
                    host = %target.host(),
                    ip = %target.ip(),
                    delay_ms = startup_delay.as_millis() as u64,
                    "Target started"
                );
                targets.push(Arc::new(target));
            }
            Err(e) => {
                tracing::error!(name = %name, error = %e, "Failed to start target");
            }
        }
    }

    if targets.is_empty() {
        tracing::warn!("No targets started; check the configuration");
    }

    let reporter = tokio::spawn(report_loop(targets.clone(), cli.report_interval));

    shutdown_signal().await;

    tracing::info!("Shutting down targets...");
    reporter.abort();
    for target in &targets {
        target.stop().await;
        let snapshot = target.compute().await;
        tracing::info!(
            name = %target.name(),
            snt = snapshot.snt_summary,
            failed = snapshot.snt_fail_summary,
            "Target stopped"
        );
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Pick a random startup delay within the configured stagger window.
fn stagger_delay(spread: Duration) -> Duration {
    if spread.is_zero() {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..spread.as_millis().max(1) as u64))
}

/// Log a snapshot of every target on a fixed cadence.
async fn report_loop(targets: Vec<Arc<PingTarget>>, interval: Duration) {
    let mut tick = tokio::time::interval(interval.max(Duration::from_secs(1)));
    tick.tick().await;
    loop {
        tick.tick().await;
        for target in &targets {
            let snapshot = target.compute().await;
            tracing::info!(
                name = %target.name(),
                host = %target.host(),
                success = snapshot.success,
                drop_rate = snapshot.drop_rate,
                avg_us = snapshot.avg_time.as_micros() as u64,
                best_us = snapshot.best_time.as_micros() as u64,
                worst_us = snapshot.worst_time.as_micros() as u64,
                snt = snapshot.snt_summary,
                failed = snapshot.snt_fail_summary,
                "Target report"
            );
        }
    }
}

/// Wait for ctrl-c or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }
}

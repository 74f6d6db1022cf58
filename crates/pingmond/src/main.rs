//! pingmond — the pingmon daemon.
//!
//! Single binary that assembles the monitor:
//! - ICMP prober (echo rounds over all configured hosts)
//! - Status engine (hysteresis state machine, single owner of host state)
//! - Dispatcher + per-area batchers (debounced notifications)
//! - Notifier (SMTP if configured, log-only otherwise)
//!
//! # Usage
//!
//! ```text
//! pingmond run --config /etc/pingmon/pingmon.toml
//! pingmond gen --output pingmon.toml
//! ```

use std::collections::HashMap;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use pingmon_core::{MonitorConfig, Settings};
use pingmon_engine::{Host, HostRegistry, StatusEngine, TransitionEvent};
use pingmon_notify::{AreaBatcher, Dispatcher, LogNotifier, MailNotifier, Notifier};
use pingmon_probe::{IcmpProber, ProberConfig, dns_egress_check};

#[derive(Parser)]
#[command(name = "pingmond", about = "ICMP host monitor with batched notifications")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the monitor.
    Run {
        /// Path to the config file.
        #[arg(long, default_value = "/etc/pingmon/pingmon.toml")]
        config: PathBuf,
    },
    /// Write an example config file and exit.
    Gen {
        /// Where to write the example config.
        #[arg(long, default_value = "pingmon.toml")]
        output: PathBuf,
    },
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.parse().unwrap()),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run { config } => {
            let settings = Settings::from_config(MonitorConfig::from_file(&config)?)?;
            init_tracing(settings.debug);
            run_monitor(settings).await
        }
        Command::Gen { output } => {
            init_tracing(false);
            if output.exists() {
                anyhow::bail!("{} already exists, not overwriting", output.display());
            }
            std::fs::write(&output, MonitorConfig::example().to_toml_string()?)?;
            info!(path = %output.display(), "example config written");
            Ok(())
        }
    }
}

async fn run_monitor(settings: Settings) -> anyhow::Result<()> {
    info!(
        hosts = settings.host_count(),
        areas = settings.groups.len(),
        poll_interval = ?settings.poll_interval,
        down_threshold = settings.down_threshold,
        relay_time = ?settings.relay_time,
        "pingmon daemon starting"
    );

    // ── Resolve targets and build the registry ─────────────────

    let mut registry = HostRegistry::new();
    let mut targets = Vec::new();
    for group in &settings.groups {
        for entry in &group.hosts {
            let addr = match resolve(&entry.address).await {
                Ok(addr) => addr,
                Err(err) => {
                    warn!(name = %entry.name, address = %entry.address, error = %err,
                        "cannot resolve host, skipping");
                    continue;
                }
            };
            if !registry.insert(Host::new(&entry.name, addr, &group.area, &group.name)) {
                warn!(name = %entry.name, %addr, "duplicate resolved address, skipping");
                continue;
            }
            info!(name = %entry.name, %addr, area = %group.area, "monitoring host");
            targets.push(addr);
        }
    }
    if registry.is_empty() {
        anyhow::bail!("no resolvable hosts to monitor");
    }
    let host_count = registry.len();

    // ── Notifier ───────────────────────────────────────────────

    let notifier: Arc<dyn Notifier> = match settings.mail.clone() {
        Some(mail) => {
            let area_emails: HashMap<String, String> = settings
                .groups
                .iter()
                .filter_map(|g| g.email.clone().map(|e| (g.area.clone(), e)))
                .collect();
            info!(smtp = %mail.smtp_host, "mail notifier configured");
            Arc::new(MailNotifier::new(mail, area_emails))
        }
        None => {
            info!("no mail config, notifications go to the log");
            Arc::new(LogNotifier)
        }
    };

    // ── Notification pipeline: batchers, then dispatcher ───────

    let mut batcher_handles = Vec::new();
    let mut areas: HashMap<String, mpsc::Sender<TransitionEvent>> = HashMap::new();
    for group in &settings.groups {
        let (tx, rx) = mpsc::channel(group.hosts.len().max(1));
        areas.insert(group.area.clone(), tx);
        let batcher = AreaBatcher::new(
            &group.area,
            &group.name,
            settings.relay_time,
            notifier.clone(),
        );
        batcher_handles.push(tokio::spawn(batcher.run(rx)));
    }

    let (events_tx, events_rx) = mpsc::channel(2 * host_count);
    let dispatcher_handle = tokio::spawn(Dispatcher::new(areas).run(events_rx));

    // ── Status engine ──────────────────────────────────────────

    let egress = dns_egress_check(&settings.heartbeat);
    let (engine, snapshot_rx) =
        StatusEngine::new(registry, settings.down_threshold, egress, events_tx);

    // ── Prober ─────────────────────────────────────────────────

    let (reply_tx, reply_rx) = mpsc::channel(host_count);
    let (round_tx, round_rx) = mpsc::channel(1);
    let prober_config = ProberConfig {
        round_timeout: settings.poll_interval,
        ..Default::default()
    };
    let mut prober = IcmpProber::new(prober_config, reply_tx, round_tx)?;
    for addr in targets {
        prober.add_target(addr);
    }

    // ── Run until ctrl-c ───────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let engine_handle = tokio::spawn(engine.run(reply_rx, round_rx, shutdown_rx.clone()));
    let prober_handle = tokio::spawn(prober.run(shutdown_rx));

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    // Stopping the engine closes the pipeline end to end: the dispatcher
    // drains out, then each batcher flushes whatever it still holds.
    let _ = prober_handle.await;
    let _ = engine_handle.await;
    let _ = dispatcher_handle.await;
    for handle in batcher_handles {
        let _ = handle.await;
    }

    for host in snapshot_rx.borrow().iter() {
        info!(%host, "final status");
    }
    info!("pingmon daemon stopped");
    Ok(())
}

/// Resolve a configured address: IP literals pass through, names go
/// through the system resolver.
async fn resolve(address: &str) -> anyhow::Result<IpAddr> {
    if let Ok(ip) = address.parse::<IpAddr>() {
        return Ok(ip);
    }
    let mut addrs = tokio::net::lookup_host((address, 0)).await?;
    addrs
        .next()
        .map(|sa| sa.ip())
        .ok_or_else(|| anyhow::anyhow!("{address} resolved to no addresses"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_passes_ip_literals_through() {
        assert_eq!(
            resolve("192.0.2.7").await.unwrap(),
            "192.0.2.7".parse::<IpAddr>().unwrap()
        );
        assert_eq!(
            resolve("2001:db8::1").await.unwrap(),
            "2001:db8::1".parse::<IpAddr>().unwrap()
        );
    }

    #[tokio::test]
    async fn resolve_rejects_reserved_invalid_names() {
        assert!(resolve("host.invalid").await.is_err());
    }
}

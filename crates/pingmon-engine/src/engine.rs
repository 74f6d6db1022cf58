//! Status engine — the single-writer event loop behind all host state.
//!
//! Consumes the prober's reply and round-complete channels, applies the
//! hysteresis rules, and emits [`TransitionEvent`]s on actual status
//! flips. Emission is a non-blocking enqueue into a bounded queue: a slow
//! notification path can drop events, never stall the engine.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::SystemTime;

use pingmon_probe::{EgressCheck, Reply};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::registry::{FAIL_CAP, Host, HostRegistry};
use crate::transition::TransitionEvent;

/// Floor for the configured down threshold.
const MIN_DOWN_THRESHOLD: u32 = 3;

pub struct StatusEngine {
    registry: HostRegistry,
    /// Per-round reply markers. Keys are exactly the registry's addresses;
    /// `None` at round end means no reply arrived since the last reset.
    results: HashMap<IpAddr, Option<Reply>>,
    down_threshold: u32,
    egress: EgressCheck,
    events_tx: mpsc::Sender<TransitionEvent>,
    snapshot_tx: watch::Sender<Vec<Host>>,
}

impl StatusEngine {
    /// Build the engine around a populated registry.
    ///
    /// Returns the engine and the watch side of the copy-on-read host
    /// snapshots. `down_threshold` is floor-clamped to 3.
    pub fn new(
        registry: HostRegistry,
        down_threshold: u32,
        egress: EgressCheck,
        events_tx: mpsc::Sender<TransitionEvent>,
    ) -> (Self, watch::Receiver<Vec<Host>>) {
        let results = registry.addrs().map(|addr| (addr, None)).collect();
        let (snapshot_tx, snapshot_rx) = watch::channel(registry.snapshot());
        let engine = Self {
            registry,
            results,
            down_threshold: down_threshold.max(MIN_DOWN_THRESHOLD),
            egress,
            events_tx,
            snapshot_tx,
        };
        (engine, snapshot_rx)
    }

    /// Consume prober events until shutdown or until the prober side
    /// hangs up. Both inbound channels are owned by the prober, so a
    /// `None` on either means no more rounds are coming.
    pub async fn run(
        mut self,
        mut reply_rx: mpsc::Receiver<Reply>,
        mut round_rx: mpsc::Receiver<()>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(
            hosts = self.registry.len(),
            down_threshold = self.down_threshold,
            "status engine starting"
        );
        loop {
            tokio::select! {
                reply = reply_rx.recv() => match reply {
                    Some(reply) => self.handle_reply(reply, SystemTime::now()),
                    None => break,
                },
                round = round_rx.recv() => match round {
                    Some(()) => self.handle_round_complete().await,
                    None => break,
                },
                _ = shutdown.changed() => {
                    info!("status engine shutting down");
                    break;
                }
            }
        }
    }

    /// An echo reply arrived for `reply.addr`.
    fn handle_reply(&mut self, reply: Reply, now: SystemTime) {
        let threshold = self.down_threshold;
        let Some(host) = self.registry.get_mut(reply.addr) else {
            // Stale or misconfigured prober target.
            return;
        };

        host.last_rtt = Some(reply.rtt);
        let previous_seen = host.last_seen;
        host.last_seen = Some(now);

        // Unwind the failure counter toward zero. A fully-down host
        // restarts from one below the threshold, so recovery takes
        // several consecutive replies rather than one.
        if host.fail_count >= threshold {
            host.fail_count = threshold - 1;
            debug!(
                area = %host.area_id,
                name = %host.name,
                fail_count = host.fail_count,
                rtt = ?reply.rtt,
                "reply while recovering"
            );
        } else if host.fail_count > 0 {
            host.fail_count -= 1;
            debug!(
                area = %host.area_id,
                name = %host.name,
                fail_count = host.fail_count,
                rtt = ?reply.rtt,
                "reply while recovering"
            );
        }

        let mut event = None;
        let mut flipped = false;
        if host.fail_count == 0 && !host.alive {
            host.alive = true;
            flipped = true;
            info!(host = %host, "host up");
            if previous_seen.is_some() {
                event = Some(TransitionEvent::of(host, now));
            } else {
                // First-ever success: nothing recovered, nothing to report.
                debug!(name = %host.name, "first reply, recovery notice suppressed");
            }
        }

        self.results.insert(reply.addr, Some(reply));

        if let Some(event) = event {
            self.emit(event);
        }
        if flipped {
            self.publish_snapshot();
        }
    }

    /// A probe round finished; account for every host that did not answer.
    async fn handle_round_complete(&mut self) {
        // If our own egress is impaired, every host looks down. Skip the
        // whole round; unanswered markers carry over into the next one.
        if let Err(err) = (self.egress)().await {
            error!(error = %err, "egress check failed, skipping down-processing this round");
            return;
        }

        let now = SystemTime::now();
        let mut events = Vec::new();
        let addrs: Vec<IpAddr> = self.results.keys().copied().collect();

        for addr in addrs {
            let answered = matches!(self.results.get(&addr), Some(Some(_)));
            if !answered {
                let Some(host) = self.registry.get_mut(addr) else {
                    continue;
                };
                if host.fail_count < FAIL_CAP {
                    host.fail_count += 1;
                } else {
                    // At the cap the original monitor also skipped the
                    // round-table reset below; keep that carry-over.
                    continue;
                }
                debug!(
                    area = %host.area_id,
                    name = %host.name,
                    fail_count = host.fail_count,
                    "no reply this round"
                );
                if host.fail_count >= self.down_threshold && host.alive {
                    host.alive = false;
                    warn!(host = %host, fail_count = host.fail_count, "host down");
                    events.push(TransitionEvent::of(host, now));
                }
            }
            self.results.insert(addr, None);
        }

        // A down transition is always reported, never suppressed.
        for event in events {
            self.emit(event);
        }
        self.publish_snapshot();
    }

    /// Non-blocking enqueue toward the dispatcher.
    fn emit(&self, event: TransitionEvent) {
        match self.events_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                debug!(name = %event.name, "transition queue full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                debug!(name = %event.name, "dispatcher gone, dropping event");
            }
        }
    }

    fn publish_snapshot(&self) {
        self.snapshot_tx.send_replace(self.registry.snapshot());
    }
}

//! ICMP prober — periodic echo rounds over surge-ping.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use surge_ping::{Client, Config, ICMP, PingIdentifier, PingSequence};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, info};

/// Errors raised while setting up the ICMP sockets.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Raw/DGRAM ICMP socket creation failed (usually a privilege problem).
    #[error("failed to open ICMP socket: {0}")]
    Socket(#[from] std::io::Error),
}

/// One answered echo request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    pub addr: IpAddr,
    pub rtt: Duration,
}

/// Prober tuning.
#[derive(Debug, Clone)]
pub struct ProberConfig {
    /// How long a round waits for replies. Doubles as the round period:
    /// a new round starts every `round_timeout`.
    pub round_timeout: Duration,
    /// Echo payload size in bytes.
    pub payload_size: usize,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            round_timeout: Duration::from_secs(30),
            payload_size: 32,
        }
    }
}

/// Sends one echo request per target per round and reports outcomes over
/// two channels: a [`Reply`] per answered echo, and a `()` on the round
/// channel when the round's reply window closes.
///
/// Unanswered echoes are deliberately silent here; the status engine
/// derives misses from the round-complete marker.
pub struct IcmpProber {
    client_v4: Client,
    client_v6: Client,
    ident: PingIdentifier,
    targets: Vec<IpAddr>,
    config: ProberConfig,
    reply_tx: mpsc::Sender<Reply>,
    round_tx: mpsc::Sender<()>,
}

impl IcmpProber {
    pub fn new(
        config: ProberConfig,
        reply_tx: mpsc::Sender<Reply>,
        round_tx: mpsc::Sender<()>,
    ) -> Result<Self, ProbeError> {
        let client_v4 = Client::new(&Config::default())?;
        let client_v6 = Client::new(&Config::builder().kind(ICMP::V6).build())?;
        Ok(Self {
            client_v4,
            client_v6,
            ident: PingIdentifier(rand::random()),
            targets: Vec::new(),
            config,
            reply_tx,
            round_tx,
        })
    }

    /// Register a target for every subsequent round.
    pub fn add_target(&mut self, addr: IpAddr) {
        debug!(%addr, "probe target added");
        self.targets.push(addr);
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Run echo rounds until shutdown or until the engine side hangs up.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let payload: Arc<[u8]> = vec![0u8; self.config.payload_size].into();
        let mut ticker = tokio::time::interval(self.config.round_timeout);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut seq: u16 = 0;

        info!(
            targets = self.targets.len(),
            round_timeout = ?self.config.round_timeout,
            "prober starting"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_round(PingSequence(seq), &payload).await;
                    seq = seq.wrapping_add(1);
                    if self.round_tx.send(()).await.is_err() {
                        debug!("engine side closed, prober stopping");
                        break;
                    }
                }
                _ = shutdown.changed() => {
                    info!("prober shutting down");
                    break;
                }
            }
        }
    }

    /// Fan one echo out to every target and wait for the round to settle.
    ///
    /// Each ping is bounded by the round timeout, so joining the set never
    /// takes longer than one round.
    async fn run_round(&self, seq: PingSequence, payload: &Arc<[u8]>) {
        let mut set = JoinSet::new();
        for &addr in &self.targets {
            let client = match addr {
                IpAddr::V4(_) => self.client_v4.clone(),
                IpAddr::V6(_) => self.client_v6.clone(),
            };
            let reply_tx = self.reply_tx.clone();
            let payload = payload.clone();
            let ident = self.ident;
            let timeout = self.config.round_timeout;

            set.spawn(async move {
                let mut pinger = client.pinger(addr, ident).await;
                pinger.timeout(timeout);
                match pinger.ping(seq, &payload).await {
                    Ok((_packet, rtt)) => {
                        let _ = reply_tx.send(Reply { addr, rtt }).await;
                    }
                    Err(err) => {
                        // A miss is not an error; the engine counts it
                        // when the round completes.
                        debug!(%addr, %err, "no echo reply");
                    }
                }
            });
        }
        while set.join_next().await.is_some() {}
    }
}

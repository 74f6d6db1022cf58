//! Transition events — immutable snapshots of a status flip.

use std::net::IpAddr;
use std::time::{Duration, SystemTime};

use crate::registry::Host;

/// Emitted only when a host's `alive` actually flips. Carries exactly the
/// display fields a notification line needs.
#[derive(Debug, Clone)]
pub struct TransitionEvent {
    pub name: String,
    pub addr: IpAddr,
    pub area_id: String,
    pub area_name: String,
    /// The new status.
    pub up: bool,
    pub rtt: Option<Duration>,
    /// For a down transition, when the host last answered; for an up
    /// transition, the recovery time itself.
    pub last_seen: Option<SystemTime>,
    pub at: SystemTime,
}

impl TransitionEvent {
    pub(crate) fn of(host: &Host, at: SystemTime) -> Self {
        Self {
            name: host.name.clone(),
            addr: host.addr,
            area_id: host.area_id.clone(),
            area_name: host.area_name.clone(),
            up: host.alive,
            rtt: host.last_rtt,
            last_seen: host.last_seen,
            at,
        }
    }
}

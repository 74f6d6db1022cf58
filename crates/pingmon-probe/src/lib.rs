//! pingmon-probe — ICMP echo rounds and the egress self-check.
//!
//! The prober owns no host state. It fans one echo request out to every
//! target each round and reports back over two channels: a `Reply` per
//! answered echo, and one round-complete marker when the round's reply
//! window closes. The status engine on the other end of those channels
//! is the single owner of all per-host bookkeeping.

pub mod egress;
pub mod icmp;

pub use egress::{EgressCheck, dns_egress_check};
pub use icmp::{IcmpProber, ProbeError, ProberConfig, Reply};

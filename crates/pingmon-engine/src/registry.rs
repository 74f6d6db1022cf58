//! Host registry — the set of monitored targets and their status fields.
//!
//! Owned exclusively by the status engine's event loop; no locking. Other
//! components read copy-on-read snapshots published over a watch channel.

use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;

/// Upper bound on a host's consecutive-miss counter.
pub const FAIL_CAP: u32 = 15;

/// One monitored target.
///
/// `fail_count` stays within `[0, FAIL_CAP]`. While the host is up it
/// counts misses toward the down threshold; while down it counts down
/// toward zero as replies arrive.
#[derive(Debug, Clone, Serialize)]
pub struct Host {
    pub name: String,
    /// Resolved address, unique across the registry.
    pub addr: IpAddr,
    pub area_id: String,
    pub area_name: String,
    /// Up/down status. New hosts start down until their first reply.
    pub alive: bool,
    pub fail_count: u32,
    /// Round-trip time of the most recent reply. Display only.
    pub last_rtt: Option<Duration>,
    /// Time of the most recent reply. `None` means never answered.
    pub last_seen: Option<SystemTime>,
}

impl Host {
    pub fn new(name: &str, addr: IpAddr, area_id: &str, area_name: &str) -> Self {
        Self {
            name: name.to_string(),
            addr,
            area_id: area_id.to_string(),
            area_name: area_name.to_string(),
            alive: false,
            fail_count: 0,
            last_rtt: None,
            last_seen: None,
        }
    }
}

impl fmt::Display for Host {
    /// One-line summary: area, name, address, status, last success.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.alive { "up" } else { "down" };
        write!(
            f,
            "area: {} name: {} address: {} {}, last seen: {}",
            self.area_name,
            self.name,
            self.addr,
            status,
            match self.last_seen {
                Some(t) => format_epoch(t),
                None => "never".to_string(),
            }
        )
    }
}

fn format_epoch(t: SystemTime) -> String {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => format!("{}s since epoch", d.as_secs()),
        Err(_) => "before epoch".to_string(),
    }
}

/// All monitored hosts, keyed by resolved address.
///
/// Static topology: populated once at startup, never mutated structurally
/// afterwards. Duplicate addresses are a configuration error caught at
/// load time, not defended against here.
#[derive(Debug, Default)]
pub struct HostRegistry {
    hosts: HashMap<IpAddr, Host>,
}

impl HostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a host. Returns false (and keeps the existing entry) if the
    /// address is already registered.
    pub fn insert(&mut self, host: Host) -> bool {
        match self.hosts.entry(host.addr) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(host);
                true
            }
        }
    }

    pub fn get(&self, addr: IpAddr) -> Option<&Host> {
        self.hosts.get(&addr)
    }

    pub fn get_mut(&mut self, addr: IpAddr) -> Option<&mut Host> {
        self.hosts.get_mut(&addr)
    }

    pub fn addrs(&self) -> impl Iterator<Item = IpAddr> + '_ {
        self.hosts.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Copy-on-read snapshot of every host, ordered by area then name so
    /// status listings are stable across calls.
    pub fn snapshot(&self) -> Vec<Host> {
        let mut hosts: Vec<Host> = self.hosts.values().cloned().collect();
        hosts.sort_by(|a, b| (&a.area_id, &a.name).cmp(&(&b.area_id, &b.name)));
        hosts
    }

    /// Snapshot filtered to one area.
    pub fn snapshot_area(&self, area_id: &str) -> Vec<Host> {
        let mut hosts: Vec<Host> = self
            .hosts
            .values()
            .filter(|h| h.area_id == area_id)
            .cloned()
            .collect();
        hosts.sort_by(|a, b| a.name.cmp(&b.name));
        hosts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(name: &str, addr: &str, area: &str) -> Host {
        Host::new(name, addr.parse().unwrap(), area, area)
    }

    #[test]
    fn insert_and_lookup() {
        let mut registry = HostRegistry::new();
        assert!(registry.insert(host("gw1", "192.0.2.1", "east")));
        assert_eq!(registry.len(), 1);

        let found = registry.get("192.0.2.1".parse().unwrap()).unwrap();
        assert_eq!(found.name, "gw1");
        assert!(!found.alive);
        assert_eq!(found.fail_count, 0);
        assert!(found.last_seen.is_none());

        assert!(registry.get("192.0.2.9".parse().unwrap()).is_none());
    }

    #[test]
    fn duplicate_address_keeps_first() {
        let mut registry = HostRegistry::new();
        assert!(registry.insert(host("gw1", "192.0.2.1", "east")));
        assert!(!registry.insert(host("gw2", "192.0.2.1", "west")));
        assert_eq!(registry.get("192.0.2.1".parse().unwrap()).unwrap().name, "gw1");
    }

    #[test]
    fn snapshot_is_ordered_and_detached() {
        let mut registry = HostRegistry::new();
        registry.insert(host("b", "192.0.2.2", "west"));
        registry.insert(host("a", "192.0.2.1", "east"));
        registry.insert(host("c", "192.0.2.3", "east"));

        let snap = registry.snapshot();
        let names: Vec<&str> = snap.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c", "b"]);

        // Mutating the registry afterwards must not affect the snapshot.
        registry.get_mut("192.0.2.1".parse().unwrap()).unwrap().alive = true;
        assert!(!snap[0].alive);
    }

    #[test]
    fn snapshot_area_filters() {
        let mut registry = HostRegistry::new();
        registry.insert(host("a", "192.0.2.1", "east"));
        registry.insert(host("b", "192.0.2.2", "west"));

        let east = registry.snapshot_area("east");
        assert_eq!(east.len(), 1);
        assert_eq!(east[0].name, "a");
        assert!(registry.snapshot_area("north").is_empty());
    }

    #[test]
    fn display_one_liner() {
        let mut h = host("gw1", "192.0.2.1", "east");
        assert_eq!(
            h.to_string(),
            "area: east name: gw1 address: 192.0.2.1 down, last seen: never"
        );
        h.alive = true;
        h.last_seen = Some(UNIX_EPOCH + Duration::from_secs(100));
        assert!(h.to_string().contains("up, last seen: 100s since epoch"));
    }

    #[test]
    fn snapshot_serializes() {
        let mut registry = HostRegistry::new();
        registry.insert(host("gw1", "192.0.2.1", "east"));
        let json = serde_json::to_string(&registry.snapshot()).unwrap();
        assert!(json.contains("\"gw1\""));
        assert!(json.contains("192.0.2.1"));
    }
}

//! Validated runtime settings derived from the raw config.

use std::collections::HashSet;
use std::time::Duration;

use crate::config::{GroupConfig, MailConfig, MonitorConfig, parse_duration};
use crate::error::ConfigError;

/// Minimum probe round interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Minimum consecutive missed rounds before a host is declared down.
pub const MIN_DOWN_THRESHOLD: u32 = 3;

/// Allowed range for the notification quiet window, in seconds.
pub const RELAY_TIME_RANGE: std::ops::RangeInclusive<u64> = 1..=60;

/// Clamped, validated settings. The only way to construct one is
/// [`Settings::from_config`], so holders can rely on the bounds.
#[derive(Debug, Clone)]
pub struct Settings {
    pub debug: bool,
    pub heartbeat: String,
    /// Round interval, >= [`MIN_POLL_INTERVAL`].
    pub poll_interval: Duration,
    /// Down threshold, >= [`MIN_DOWN_THRESHOLD`].
    pub down_threshold: u32,
    /// Batch quiet window, within [`RELAY_TIME_RANGE`].
    pub relay_time: Duration,
    pub mail: Option<MailConfig>,
    pub groups: Vec<GroupConfig>,
}

impl Settings {
    /// Validate and clamp a parsed config.
    ///
    /// Out-of-range numeric values are clamped rather than rejected, the
    /// way the operator expects a long-running daemon to behave; structural
    /// problems (no groups, duplicate areas or addresses) are errors.
    pub fn from_config(config: MonitorConfig) -> Result<Self, ConfigError> {
        if config.groups.is_empty() {
            return Err(ConfigError::NoGroups);
        }

        let mut areas = HashSet::new();
        let mut addresses = HashSet::new();
        for group in &config.groups {
            if group.hosts.is_empty() {
                return Err(ConfigError::EmptyGroup(group.area.clone()));
            }
            if !areas.insert(group.area.clone()) {
                return Err(ConfigError::DuplicateArea(group.area.clone()));
            }
            for host in &group.hosts {
                if !addresses.insert(host.address.clone()) {
                    return Err(ConfigError::DuplicateAddress(host.address.clone()));
                }
            }
        }

        let poll_interval = parse_duration(&config.interval)?.max(MIN_POLL_INTERVAL);
        let down_threshold = config.times.max(MIN_DOWN_THRESHOLD);
        let relay_secs = config
            .relay_time
            .clamp(*RELAY_TIME_RANGE.start(), *RELAY_TIME_RANGE.end());

        Ok(Settings {
            debug: config.debug,
            heartbeat: config.heartbeat,
            poll_interval,
            down_threshold,
            relay_time: Duration::from_secs(relay_secs),
            mail: config.mail,
            groups: config.groups,
        })
    }

    /// Total number of configured hosts across all groups.
    pub fn host_count(&self) -> usize {
        self.groups.iter().map(|g| g.hosts.len()).sum()
    }
}

//! pingmon.toml configuration parser.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The on-disk configuration file, as written by the operator.
///
/// Raw values are not trusted: [`crate::Settings::from_config`] applies
/// the clamping and validation pass before anything else sees them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Emit per-round detail at debug level.
    #[serde(default)]
    pub debug: bool,
    /// Well-known name resolved once per round as the egress self-check.
    pub heartbeat: String,
    /// Probe round interval, e.g. "30s". Floor-clamped to 30s.
    #[serde(default = "default_interval")]
    pub interval: String,
    /// Consecutive missed rounds before a host is declared down. Floor 3.
    #[serde(default = "default_times")]
    pub times: u32,
    /// Notification batch quiet window in seconds, clamped to [1, 60].
    #[serde(default = "default_relay_time")]
    pub relay_time: u64,
    /// SMTP delivery settings. Absent means log-only notifications.
    pub mail: Option<MailConfig>,
    /// Monitored host groups, one per area.
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub mail_from: String,
    /// Recipients for every notification, regardless of area.
    #[serde(default)]
    pub rcpt_to: Vec<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// One monitored area: an id, a display name, and its hosts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    pub area: String,
    pub name: String,
    /// Extra recipient appended for this area's notifications.
    pub email: Option<String>,
    #[serde(default)]
    pub hosts: Vec<HostEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostEntry {
    pub name: String,
    /// IP literal or resolvable hostname.
    pub address: String,
}

fn default_interval() -> String {
    "30s".to_string()
}

fn default_times() -> u32 {
    3
}

fn default_relay_time() -> u64 {
    30
}

fn default_smtp_port() -> u16 {
    25
}

impl MonitorConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: MonitorConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Scaffold an example config for `pingmond gen`.
    pub fn example() -> Self {
        MonitorConfig {
            debug: false,
            heartbeat: "example.com".to_string(),
            interval: "30s".to_string(),
            times: 3,
            relay_time: 30,
            mail: Some(MailConfig {
                smtp_host: "smtp.example.com".to_string(),
                smtp_port: 25,
                mail_from: "monitor@example.com".to_string(),
                rcpt_to: vec!["ops@example.com".to_string()],
                username: None,
                password: None,
            }),
            groups: vec![GroupConfig {
                area: "east".to_string(),
                name: "East region".to_string(),
                email: Some("east-ops@example.com".to_string()),
                hosts: vec![
                    HostEntry {
                        name: "gw1".to_string(),
                        address: "192.0.2.1".to_string(),
                    },
                    HostEntry {
                        name: "gw2".to_string(),
                        address: "192.0.2.2".to_string(),
                    },
                ],
            }],
        }
    }
}

/// Parse a duration string like "30s", "500ms", "2m".
///
/// A plain number is taken as seconds.
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let trimmed = s.trim();
    let parsed = if let Some(secs) = trimmed.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = trimmed.strip_suffix('m') {
        mins.parse::<u64>().ok().map(|m| Duration::from_secs(m * 60))
    } else {
        trimmed.parse::<u64>().ok().map(Duration::from_secs)
    };
    parsed.ok_or_else(|| ConfigError::InvalidDuration(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal() {
        let toml_str = r#"
heartbeat = "example.com"

[[groups]]
area = "east"
name = "East"
hosts = [{ name = "gw1", address = "192.0.2.1" }]
"#;
        let config: MonitorConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.heartbeat, "example.com");
        assert_eq!(config.interval, "30s");
        assert_eq!(config.times, 3);
        assert_eq!(config.relay_time, 30);
        assert!(config.mail.is_none());
        assert_eq!(config.groups.len(), 1);
        assert_eq!(config.groups[0].hosts[0].name, "gw1");
    }

    #[test]
    fn example_round_trips() {
        let config = MonitorConfig::example();
        let toml_str = config.to_toml_string().unwrap();
        let parsed: MonitorConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.groups[0].area, "east");
        assert_eq!(parsed.mail.unwrap().smtp_port, 25);
    }

    #[test]
    fn from_file_reads_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pingmon.toml");
        std::fs::write(&path, MonitorConfig::example().to_toml_string().unwrap()).unwrap();

        let config = MonitorConfig::from_file(&path).unwrap();
        assert_eq!(config.groups.len(), 1);
    }

    #[test]
    fn parse_duration_forms() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("10").unwrap(), Duration::from_secs(10));
    }

    #[test]
    fn parse_duration_rejects_garbage() {
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("").is_err());
    }
}

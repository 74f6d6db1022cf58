//! pingmon-core — configuration for the pingmon daemon.
//!
//! Parses the TOML config file into [`MonitorConfig`], then validates and
//! clamps it into runtime [`Settings`]. All bounds the rest of the system
//! relies on (minimum poll interval, minimum down threshold, relay window
//! range) are enforced here, once, so downstream crates can trust the
//! values they receive.

pub mod config;
pub mod error;
pub mod settings;

pub use config::{GroupConfig, HostEntry, MailConfig, MonitorConfig, parse_duration};
pub use error::ConfigError;
pub use settings::Settings;

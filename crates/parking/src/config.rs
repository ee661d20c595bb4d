//! Detector settings.

use std::borrow::Cow;
use std::env;

const DEFAULT_ALERT_CHANNEL: &str = "/topic/parking-alerts";

/// Settings for the detector and its worker pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Broadcast channel alerts are published on.
    pub alert_channel: Cow<'static, str>,
    /// Number of single-threaded shards samples are routed to.
    pub workers: usize,
    /// Samples buffered per shard before dispatch waits.
    pub mailbox_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self { alert_channel: Cow::Borrowed(DEFAULT_ALERT_CHANNEL), workers: 8, mailbox_capacity: 256 }
    }
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            alert_channel: env::var("PARKING_ALERT_CHANNEL")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map_or(defaults.alert_channel, Cow::Owned),
            workers: env_usize("PARKING_WORKERS", defaults.workers),
            mailbox_capacity: env_usize("PARKING_MAILBOX_CAPACITY", defaults.mailbox_capacity),
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

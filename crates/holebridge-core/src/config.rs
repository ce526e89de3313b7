// ── Runtime bridge configuration ──
//
// These types describe *how* to run the bridge: which broker, which
// store, which topics. They carry credential data but never touch disk.
// The binary builds a `BridgeConfig` through holebridge-config and
// hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::topics::TopicLayout;

/// Broker login. Absent when the broker allows anonymous clients.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

/// How to reach the MQTT broker.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub credentials: Option<Credentials>,
    pub client_id: String,
    pub keep_alive: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 1883,
            credentials: None,
            client_id: "holebridge".into(),
            keep_alive: Duration::from_secs(30),
        }
    }
}

/// Where the Pi-hole state lives and which groups are exposed.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to `gravity.db`.
    pub gravity_db: PathBuf,
    /// The `pihole` executable.
    pub pihole_bin: PathBuf,
    /// The `sqlite3` executable.
    pub sqlite_bin: PathBuf,
    /// Case-insensitive substring a group name must contain to be exposed.
    pub group_filter: String,
    /// Reload the block lists after a group mutation.
    pub reload_lists: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            gravity_db: "/etc/pihole/gravity.db".into(),
            pihole_bin: "/usr/local/bin/pihole".into(),
            sqlite_bin: "sqlite3".into(),
            group_filter: "block".into(),
            reload_lists: true,
        }
    }
}

/// Values that replace the auto-detected device identity.
#[derive(Debug, Clone, Default)]
pub struct DeviceOverrides {
    pub mac: Option<String>,
    pub sw_version: Option<String>,
    pub name: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
}

/// Full configuration for one bridge process.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub broker: BrokerConfig,
    pub store: StoreConfig,
    pub topics: TopicLayout,
    pub device: DeviceOverrides,
    /// Period of the reconciliation loop.
    pub poll_interval: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            broker: BrokerConfig::default(),
            store: StoreConfig::default(),
            topics: TopicLayout::default(),
            device: DeviceOverrides::default(),
            poll_interval: Duration::from_secs(5),
        }
    }
}

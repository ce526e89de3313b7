//! Configuration for the holebridge service.
//!
//! Layered loading (defaults, TOML file, key=value environment file,
//! process environment) and translation to `holebridge_core::BridgeConfig`.
//! The core never reads configuration itself.

mod env_file;

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use holebridge_core::{
    BridgeConfig, BrokerConfig, Credentials, DeviceOverrides, StoreConfig, TopicLayout,
};

pub use env_file::{EnvFile, MQTT_KEYS};

/// Default location of the key=value environment file.
pub const DEFAULT_ENV_FILE: &str = "/etc/environment";

/// Prefix for nested overrides, e.g. `HOLEBRIDGE_PIHOLE__GROUP_FILTER`.
pub const ENV_PREFIX: &str = "HOLEBRIDGE_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Config structs ──────────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub mqtt: MqttSettings,

    #[serde(default)]
    pub pihole: PiholeSettings,

    #[serde(default)]
    pub topics: TopicSettings,

    /// Overrides for the auto-detected device identity.
    #[serde(default)]
    pub device: DeviceSettings,

    /// Seconds between reconciliation passes.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mqtt: MqttSettings::default(),
            pihole: PiholeSettings::default(),
            topics: TopicSettings::default(),
            device: DeviceSettings::default(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

fn default_poll_interval() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MqttSettings {
    /// Broker hostname or address. Required.
    pub host: Option<String>,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default, deserialize_with = "lenient_string")]
    pub username: Option<String>,

    /// Plaintext here; held as a secret once resolved.
    #[serde(default, deserialize_with = "lenient_string")]
    pub password: Option<String>,

    /// Generated per process when absent.
    pub client_id: Option<String>,

    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            host: None,
            port: default_port(),
            username: None,
            password: None,
            client_id: None,
            keep_alive_secs: default_keep_alive(),
        }
    }
}

fn default_port() -> u16 {
    1883
}
fn default_keep_alive() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PiholeSettings {
    pub gravity_db: PathBuf,
    pub pihole_bin: PathBuf,
    pub sqlite_bin: PathBuf,
    /// Only groups whose name contains this (case-insensitive) are exposed.
    pub group_filter: String,
    pub reload_lists: bool,
}

impl Default for PiholeSettings {
    fn default() -> Self {
        let store = StoreConfig::default();
        Self {
            gravity_db: store.gravity_db,
            pihole_bin: store.pihole_bin,
            sqlite_bin: store.sqlite_bin,
            group_filter: store.group_filter,
            reload_lists: store.reload_lists,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TopicSettings {
    pub group_state: String,
    pub group_set: String,
    pub global_state: String,
    pub global_set: String,
    pub stat_state: String,
    pub discovery: String,
}

impl Default for TopicSettings {
    fn default() -> Self {
        let layout = TopicLayout::default();
        Self {
            group_state: layout.group_state,
            group_set: layout.group_set,
            global_state: layout.global_state,
            global_set: layout.global_set,
            stat_state: layout.stat_state,
            discovery: layout.discovery,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DeviceSettings {
    pub mac: Option<String>,
    pub sw_version: Option<String>,
    pub name: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
}

/// Accept numbers and booleans where a string is expected. Environment
/// values such as `MQTT_PASSWORD=1234` arrive as integers.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lenient {
        Text(String),
        Signed(i64),
        Unsigned(u64),
        Real(f64),
        Flag(bool),
    }

    Ok(Option::<Lenient>::deserialize(deserializer)?.map(|value| match value {
        Lenient::Text(s) => s,
        Lenient::Signed(n) => n.to_string(),
        Lenient::Unsigned(n) => n.to_string(),
        Lenient::Real(n) => n.to_string(),
        Lenient::Flag(b) => b.to_string(),
    }))
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "holebridge", "holebridge").map_or_else(
        || PathBuf::from("/etc/holebridge/config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Where configuration is read from.
#[derive(Debug, Clone)]
pub struct ConfigSources {
    /// Explicit TOML file. Must exist when set.
    pub config_file: Option<PathBuf>,
    pub env_file: PathBuf,
}

impl Default for ConfigSources {
    fn default() -> Self {
        Self {
            config_file: None,
            env_file: PathBuf::from(DEFAULT_ENV_FILE),
        }
    }
}

/// The `MQTT_*` process variables, renamed onto `mqtt.*`.
fn mqtt_env() -> Env {
    Env::raw()
        .only(&MQTT_KEYS.map(|(name, _)| name))
        .map(|key| {
            MQTT_KEYS
                .iter()
                .find(|(name, _)| key.as_str().eq_ignore_ascii_case(name))
                .map_or_else(
                    || key.as_str().to_owned().into(),
                    |(_, field)| format!("mqtt.{field}").into(),
                )
        })
}

/// The layered provider stack, lowest priority first.
pub fn figment(sources: &ConfigSources) -> Figment {
    let toml = sources.config_file.clone().unwrap_or_else(config_path);

    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(toml))
        .merge(EnvFile::new(&sources.env_file))
        .merge(mqtt_env())
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load the full Config from every source.
pub fn load_config(sources: &ConfigSources) -> Result<Config, ConfigError> {
    if let Some(path) = &sources.config_file {
        std::fs::metadata(path)?;
    }

    let config: Config = figment(sources).extract()?;
    Ok(config)
}

// ── Translation ─────────────────────────────────────────────────────

impl Config {
    /// Validate and build the runtime configuration.
    pub fn to_bridge_config(&self) -> Result<BridgeConfig, ConfigError> {
        let host = self
            .mqtt
            .host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ConfigError::Validation {
                field: "mqtt.host".into(),
                reason: "no broker configured (set MQTT_SERVER)".into(),
            })?;

        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Validation {
                field: "poll_interval_secs".into(),
                reason: "must be greater than zero".into(),
            });
        }

        if self.pihole.group_filter.contains('/') {
            return Err(ConfigError::Validation {
                field: "pihole.group_filter".into(),
                reason: "must not contain '/'".into(),
            });
        }

        let credentials = self.mqtt.username.as_ref().map(|username| Credentials {
            username: username.clone(),
            password: SecretString::from(self.mqtt.password.clone().unwrap_or_default()),
        });

        let client_id = self
            .mqtt
            .client_id
            .clone()
            .unwrap_or_else(|| format!("holebridge-{}", uuid::Uuid::new_v4().simple()));

        Ok(BridgeConfig {
            broker: BrokerConfig {
                host: host.to_owned(),
                port: self.mqtt.port,
                credentials,
                client_id,
                keep_alive: Duration::from_secs(self.mqtt.keep_alive_secs),
            },
            store: self.store_config(),
            topics: TopicLayout {
                group_state: trim_slashes(&self.topics.group_state),
                group_set: trim_slashes(&self.topics.group_set),
                global_state: trim_slashes(&self.topics.global_state),
                global_set: trim_slashes(&self.topics.global_set),
                stat_state: trim_slashes(&self.topics.stat_state),
                discovery: trim_slashes(&self.topics.discovery),
            },
            device: self.device_overrides(),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
        })
    }
}

impl Config {
    /// Store settings alone. Needs no broker, so one-shot reads can use
    /// it without a full validation pass.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            gravity_db: self.pihole.gravity_db.clone(),
            pihole_bin: self.pihole.pihole_bin.clone(),
            sqlite_bin: self.pihole.sqlite_bin.clone(),
            group_filter: self.pihole.group_filter.clone(),
            reload_lists: self.pihole.reload_lists,
        }
    }

    pub fn device_overrides(&self) -> DeviceOverrides {
        DeviceOverrides {
            mac: self.device.mac.clone(),
            sw_version: self.device.sw_version.clone(),
            name: self.device.name.clone(),
            manufacturer: self.device.manufacturer.clone(),
            model: self.device.model.clone(),
        }
    }
}

fn trim_slashes(prefix: &str) -> String {
    prefix.trim_matches('/').to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn with_host() -> Config {
        let mut config = Config::default();
        config.mqtt.host = Some("broker.lan".into());
        config
    }

    #[test]
    fn missing_host_is_rejected() {
        let err = Config::default().to_bridge_config().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "mqtt.host"));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut config = with_host();
        config.poll_interval_secs = 0;
        assert!(matches!(
            config.to_bridge_config(),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn credentials_only_with_username() {
        let mut config = with_host();
        config.mqtt.password = Some("ignored".into());
        assert!(config.to_bridge_config().unwrap().broker.credentials.is_none());

        config.mqtt.username = Some("pihole".into());
        let bridge = config.to_bridge_config().unwrap();
        let credentials = bridge.broker.credentials.unwrap();
        assert_eq!(credentials.username, "pihole");
        assert_eq!(credentials.password.expose_secret(), "ignored");
    }

    #[test]
    fn client_id_is_generated_when_absent() {
        let bridge = with_host().to_bridge_config().unwrap();
        assert!(bridge.broker.client_id.starts_with("holebridge-"));
        assert!(bridge.broker.client_id.len() > "holebridge-".len());

        let mut config = with_host();
        config.mqtt.client_id = Some("fixed".into());
        assert_eq!(config.to_bridge_config().unwrap().broker.client_id, "fixed");
    }

    #[test]
    fn topic_prefixes_lose_trailing_slashes() {
        let mut config = with_host();
        config.topics.group_state = "pihole/groups/state/".into();
        let bridge = config.to_bridge_config().unwrap();
        assert_eq!(bridge.topics.group_state, "pihole/groups/state");
    }

    #[test]
    fn defaults_match_core_defaults() {
        let bridge = with_host().to_bridge_config().unwrap();
        assert_eq!(bridge.broker.port, 1883);
        assert_eq!(bridge.poll_interval, Duration::from_secs(5));
        assert_eq!(bridge.topics, TopicLayout::default());
        assert_eq!(bridge.store.group_filter, "block");
    }
}

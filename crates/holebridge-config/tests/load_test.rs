#![allow(clippy::unwrap_used)]
// Layered loading through figment's Jail, which isolates the working
// directory and environment of each test.

use std::path::PathBuf;

use figment::Jail;
use pretty_assertions::assert_eq;

use holebridge_config::{ConfigError, ConfigSources, load_config};

fn sources(jail: &Jail, config_file: Option<&str>) -> ConfigSources {
    ConfigSources {
        config_file: config_file.map(|name| jail.directory().join(name)),
        env_file: jail.directory().join("environment"),
    }
}

fn load(sources: &ConfigSources) -> figment::error::Result<holebridge_config::Config> {
    load_config(sources).map_err(|e| e.to_string().into())
}

#[test]
fn env_file_supplies_broker_settings() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "environment",
            r#"PATH="/usr/bin"
# broker
MQTT_SERVER="broker.lan"
MQTT_PORT=1884
MQTT_USER='pihole'
MQTT_PASSWORD=s3cret
"#,
        )?;

        let config = load(&sources(jail, None))?;
        assert_eq!(config.mqtt.host.as_deref(), Some("broker.lan"));
        assert_eq!(config.mqtt.port, 1884);
        assert_eq!(config.mqtt.username.as_deref(), Some("pihole"));
        assert_eq!(config.mqtt.password.as_deref(), Some("s3cret"));
        assert_eq!(config.poll_interval_secs, 5);
        Ok(())
    });
}

#[test]
fn process_environment_wins_over_env_file() {
    Jail::expect_with(|jail| {
        jail.create_file("environment", "MQTT_SERVER=from-file\nMQTT_PORT=1884\n")?;
        jail.set_env("MQTT_SERVER", "from-env");

        let config = load(&sources(jail, None))?;
        assert_eq!(config.mqtt.host.as_deref(), Some("from-env"));
        assert_eq!(config.mqtt.port, 1884);
        Ok(())
    });
}

#[test]
fn numeric_password_from_environment_stays_a_string() {
    Jail::expect_with(|jail| {
        jail.set_env("MQTT_SERVER", "broker.lan");
        jail.set_env("MQTT_USER", "1000");
        jail.set_env("MQTT_PASSWORD", "1234");

        let config = load(&sources(jail, None))?;
        assert_eq!(config.mqtt.username.as_deref(), Some("1000"));
        assert_eq!(config.mqtt.password.as_deref(), Some("1234"));
        Ok(())
    });
}

#[test]
fn toml_file_sits_below_env_file() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "holebridge.toml",
            r#"
poll_interval_secs = 30

[mqtt]
host = "from-toml"
keep_alive_secs = 60

[pihole]
group_filter = "kids"
reload_lists = false

[topics]
discovery = "ha"

[device]
model = "Pi 4"
"#,
        )?;
        jail.create_file("environment", "MQTT_SERVER=from-file\n")?;

        let config = load(&sources(jail, Some("holebridge.toml")))?;
        assert_eq!(config.mqtt.host.as_deref(), Some("from-file"));
        assert_eq!(config.mqtt.keep_alive_secs, 60);
        assert_eq!(config.poll_interval_secs, 30);
        assert_eq!(config.pihole.group_filter, "kids");
        assert!(!config.pihole.reload_lists);
        assert_eq!(config.pihole.gravity_db, PathBuf::from("/etc/pihole/gravity.db"));
        assert_eq!(config.topics.discovery, "ha");
        assert_eq!(config.topics.group_set, "pihole/groups/set");
        assert_eq!(config.device.model.as_deref(), Some("Pi 4"));
        Ok(())
    });
}

#[test]
fn prefixed_variables_reach_nested_keys() {
    Jail::expect_with(|jail| {
        jail.set_env("HOLEBRIDGE_MQTT__HOST", "nested.lan");
        jail.set_env("HOLEBRIDGE_PIHOLE__GROUP_FILTER", "ads");
        jail.set_env("HOLEBRIDGE_POLL_INTERVAL_SECS", "15");

        let config = load(&sources(jail, None))?;
        assert_eq!(config.mqtt.host.as_deref(), Some("nested.lan"));
        assert_eq!(config.pihole.group_filter, "ads");
        assert_eq!(config.poll_interval_secs, 15);

        let bridge = config.to_bridge_config().map_err(|e| e.to_string())?;
        assert_eq!(bridge.poll_interval.as_secs(), 15);
        Ok(())
    });
}

#[test]
fn missing_env_file_is_ignored() {
    Jail::expect_with(|jail| {
        let config = load(&sources(jail, None))?;
        assert_eq!(config.mqtt.host, None);
        assert_eq!(config.mqtt.port, 1883);
        Ok(())
    });
}

#[test]
fn explicit_config_file_must_exist() {
    Jail::expect_with(|jail| {
        let result = load_config(&sources(jail, Some("absent.toml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
        Ok(())
    });
}

#[test]
fn malformed_port_is_a_load_error() {
    Jail::expect_with(|jail| {
        jail.create_file("environment", "MQTT_PORT=eighteen\n")?;
        let result = load_config(&sources(jail, None));
        assert!(matches!(result, Err(ConfigError::Figment(_))));
        Ok(())
    });
}

#[test]
fn env_file_fills_keys_the_process_environment_leaves_out() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "environment",
            "MQTT_SERVER=from-file\nMQTT_USER=pihole\nMQTT_PASSWORD=from-file\n",
        )?;
        jail.set_env("MQTT_SERVER", "from-env");

        let config = load(&sources(jail, None))?;
        assert_eq!(config.mqtt.host.as_deref(), Some("from-env"));
        assert_eq!(config.mqtt.username.as_deref(), Some("pihole"));
        assert_eq!(config.mqtt.password.as_deref(), Some("from-file"));
        Ok(())
    });
}

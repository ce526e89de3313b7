// ── Discovery descriptors ──
//
// Wire types for the controller's discovery protocol. A descriptor is
// published once per entity per broker session, always before the
// entity's first value.

use serde::Serialize;

use crate::error::CoreError;
use crate::model::{Entity, EntityKind, MacAddress};
use crate::topics::TopicLayout;

const SWITCH_ICON: &str = "mdi:lock";
const SENSOR_ICON: &str = "mdi:chart-areaspline";
const PAYLOAD_ON: &str = "1";
const PAYLOAD_OFF: &str = "0";

// ── Device identity ─────────────────────────────────────────────────

/// Host identity shared by every entity this process publishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub mac: MacAddress,
    /// Reported verbatim, e.g. `Debian 11.7`.
    pub sw_version: String,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
}

impl DeviceIdentity {
    pub fn new(mac: MacAddress, sw_version: impl Into<String>) -> Self {
        Self {
            mac,
            sw_version: sw_version.into(),
            name: "Pi-hole".into(),
            manufacturer: "Pi-hole".into(),
            model: "DNS sinkhole".into(),
        }
    }

    /// Stable node id used inside unique ids.
    pub fn node_id(&self) -> String {
        self.mac.compact()
    }

    fn device_block(&self) -> DeviceBlock {
        DeviceBlock {
            identifiers: vec![format!("PiHole_{}", self.node_id())],
            connections: vec![["mac".to_owned(), self.mac.to_string()]],
            manufacturer: self.manufacturer.clone(),
            model: self.model.clone(),
            name: self.name.clone(),
            sw_version: self.sw_version.clone(),
        }
    }
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceBlock {
    pub identifiers: Vec<String>,
    pub connections: Vec<[String; 2]>,
    pub manufacturer: String,
    pub model: String,
    pub name: String,
    pub sw_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwitchDescriptor {
    pub name: String,
    pub unique_id: String,
    pub device: DeviceBlock,
    pub icon: &'static str,
    pub state_topic: String,
    pub command_topic: String,
    pub payload_on: &'static str,
    pub payload_off: &'static str,
    pub state_on: &'static str,
    pub state_off: &'static str,
    pub optimistic: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorDescriptor {
    pub name: String,
    pub unique_id: String,
    pub device: DeviceBlock,
    pub icon: &'static str,
    pub state_topic: String,
    pub value_template: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Descriptor {
    Switch(SwitchDescriptor),
    Sensor(SensorDescriptor),
}

/// A descriptor ready to publish.
#[derive(Debug, Clone, PartialEq)]
pub struct Announcement {
    pub topic: String,
    pub payload: String,
}

// ── Builder ─────────────────────────────────────────────────────────

/// Builds descriptors for one device and topic layout.
#[derive(Debug, Clone)]
pub struct DiscoveryBuilder {
    identity: DeviceIdentity,
    topics: TopicLayout,
}

impl DiscoveryBuilder {
    pub fn new(identity: DeviceIdentity, topics: TopicLayout) -> Self {
        Self { identity, topics }
    }

    pub fn descriptor(&self, entity: &Entity) -> Descriptor {
        let node = self.identity.node_id();
        let device = self.identity.device_block();
        let state_topic = self.topics.state_topic(&entity.key);

        match entity.kind() {
            EntityKind::Group | EntityKind::Blocking => {
                let (name, unique_id) = if entity.kind() == EntityKind::Group {
                    (
                        format!("PiHole Group {}", entity.label),
                        format!("pihole_group_{node}_{}", entity.key.id),
                    )
                } else {
                    (format!("PiHole {}", entity.label), format!("pihole_global_{node}"))
                };
                Descriptor::Switch(SwitchDescriptor {
                    name,
                    unique_id,
                    device,
                    icon: SWITCH_ICON,
                    command_topic: self.topics.command_topic(&entity.key).unwrap_or_default(),
                    state_topic,
                    payload_on: PAYLOAD_ON,
                    payload_off: PAYLOAD_OFF,
                    state_on: PAYLOAD_ON,
                    state_off: PAYLOAD_OFF,
                    optimistic: false,
                })
            }
            EntityKind::Statistic => Descriptor::Sensor(SensorDescriptor {
                name: format!("PiHole {}", entity.label),
                unique_id: format!("pihole_stat_{node}_{}", entity.key.id),
                device,
                icon: SENSOR_ICON,
                state_topic,
                value_template: "{{ value }}",
                unit_of_measurement: entity.unit.clone(),
            }),
        }
    }

    /// Topic and serialized JSON for `entity`'s descriptor.
    pub fn announcement(&self, entity: &Entity) -> Result<Announcement, CoreError> {
        Ok(Announcement {
            topic: self.topics.discovery_topic(&entity.key),
            payload: serde_json::to_string(&self.descriptor(entity))?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    use super::*;
    use crate::model::{Fact, StatValue};

    fn builder() -> DiscoveryBuilder {
        DiscoveryBuilder::new(
            DeviceIdentity::new(MacAddress::new("b8:27:eb:12:34:56"), "Debian 11.7"),
            TopicLayout::default(),
        )
    }

    fn payload(entity: &Entity) -> Value {
        serde_json::from_str(&builder().announcement(entity).unwrap().payload).unwrap()
    }

    #[test]
    fn group_switch_descriptor() {
        let announcement = builder().announcement(&Entity::group("BlockAds", false)).unwrap();
        assert_eq!(
            announcement.topic,
            "homeassistant/switch/PiHole_groups/BlockAds/config"
        );

        let value: Value = serde_json::from_str(&announcement.payload).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "PiHole Group BlockAds",
                "unique_id": "pihole_group_b827eb123456_BlockAds",
                "device": {
                    "identifiers": ["PiHole_b827eb123456"],
                    "connections": [["mac", "b8:27:eb:12:34:56"]],
                    "manufacturer": "Pi-hole",
                    "model": "DNS sinkhole",
                    "name": "Pi-hole",
                    "sw_version": "Debian 11.7"
                },
                "icon": "mdi:lock",
                "state_topic": "pihole/groups/state/BlockAds",
                "command_topic": "pihole/groups/set/BlockAds",
                "payload_on": "1",
                "payload_off": "0",
                "state_on": "1",
                "state_off": "0",
                "optimistic": false
            })
        );
    }

    #[test]
    fn blocking_switch_descriptor() {
        let value = payload(&Entity::blocking(true));
        assert_eq!(value["name"], "PiHole Global Blocking");
        assert_eq!(value["unique_id"], "pihole_global_b827eb123456");
        assert_eq!(value["command_topic"], "pihole/set/blocking");
        assert_eq!(value["state_topic"], "pihole/state/blocking");
    }

    #[test]
    fn sensor_descriptor_with_and_without_unit() {
        let temp = Entity::from(Fact {
            id: "CPU_Temp".into(),
            label: "CPU Temp".into(),
            value: StatValue::Integer(41),
            unit: Some("C".into()),
        });
        let value = payload(&temp);
        assert_eq!(value["name"], "PiHole CPU Temp");
        assert_eq!(value["unique_id"], "pihole_stat_b827eb123456_CPU_Temp");
        assert_eq!(value["icon"], "mdi:chart-areaspline");
        assert_eq!(value["value_template"], "{{ value }}");
        assert_eq!(value["unit_of_measurement"], "C");
        assert!(value.get("command_topic").is_none());

        let host = Entity::from(Fact {
            id: "Hostname".into(),
            label: "Hostname".into(),
            value: StatValue::Text("pihole".into()),
            unit: None,
        });
        assert!(payload(&host).get("unit_of_measurement").is_none());
    }
}

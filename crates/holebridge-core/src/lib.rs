// holebridge-core: State reconciliation between a Pi-hole host and an MQTT bus.

pub mod bridge;
pub mod command;
pub mod config;
pub mod discovery;
pub mod error;
pub mod extract;
pub mod model;
pub mod repository;
pub mod runner;
pub mod service;
pub mod store;
pub mod topics;
pub mod transport;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bridge::{Bridge, Dispatch, PollReport};
pub use command::{Command, Inbound};
pub use config::{BridgeConfig, BrokerConfig, Credentials, DeviceOverrides, StoreConfig};
pub use discovery::{DeviceIdentity, DiscoveryBuilder};
pub use error::CoreError;
pub use repository::PiholeRepository;
pub use runner::{CommandOutput, CommandRunner, ShellRunner};
pub use service::Service;
pub use store::{Reconciliation, StateMirror};
pub use topics::TopicLayout;
pub use transport::{MqttPublisher, Publisher};

// Re-export model types at the crate root for ergonomics.
pub use model::{Entity, EntityKey, EntityKind, EntityValue, Fact, MacAddress, StatValue};

// ── Entity records ──

use serde::Serialize;

use super::entity_key::{EntityKey, EntityKind};
use super::value::{EntityValue, StatValue};

/// A single extracted `(id, value[, unit])` triple from diagnostic text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fact {
    /// Stable id derived from the label (`CPU Temp` → `CPU_Temp`).
    pub id: String,
    pub label: String,
    pub value: StatValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// A freshly observed entity, ready for reconciliation.
///
/// Carries the metadata the discovery descriptor needs alongside the
/// value the mirror compares.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub key: EntityKey,
    /// Human-readable label (group name or statistic label).
    pub label: String,
    pub value: EntityValue,
    /// Statistics only.
    pub unit: Option<String>,
}

impl Entity {
    pub fn group(name: &str, enabled: bool) -> Self {
        Self {
            key: EntityKey::group(name),
            label: name.to_owned(),
            value: EntityValue::Switch(enabled),
            unit: None,
        }
    }

    pub fn blocking(enabled: bool) -> Self {
        Self {
            key: EntityKey::blocking(),
            label: "Global Blocking".to_owned(),
            value: EntityValue::Switch(enabled),
            unit: None,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.key.kind
    }
}

impl From<Fact> for Entity {
    fn from(fact: Fact) -> Self {
        Self {
            key: EntityKey::statistic(fact.id),
            label: fact.label,
            value: EntityValue::Stat(fact.value),
            unit: fact.unit,
        }
    }
}

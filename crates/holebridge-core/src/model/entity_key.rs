// ── Core identity types ──
//
// EntityKey and MacAddress form the foundation of every domain type.
// A key pairs the entity family with its source id, so a group and a
// statistic sharing a name never alias in the mirror.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

// ── EntityKind ──────────────────────────────────────────────────────

/// The family an entity belongs to. Families have fixed semantics.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A Pi-hole group that can be enabled or disabled.
    Group,
    /// The global DNS blocking switch. Exactly one exists.
    Blocking,
    /// A scalar extracted from the diagnostic status text.
    Statistic,
}

impl EntityKind {
    /// Discovery component the consuming controller renders this kind as.
    pub fn component(self) -> &'static str {
        match self {
            Self::Group | Self::Blocking => "switch",
            Self::Statistic => "sensor",
        }
    }
}

// ── EntityKey ───────────────────────────────────────────────────────

/// Identifier for any tracked entity: family plus stable source id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    pub kind: EntityKind,
    pub id: String,
}

impl EntityKey {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::new(EntityKind::Group, name)
    }

    pub fn statistic(id: impl Into<String>) -> Self {
        Self::new(EntityKind::Statistic, id)
    }

    /// The single global blocking switch.
    pub fn blocking() -> Self {
        Self::new(EntityKind::Blocking, "blocking")
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

// ── MacAddress ──────────────────────────────────────────────────────

/// MAC address, normalized to lowercase colon-separated format (aa:bb:cc:dd:ee:ff).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacAddress(String);

impl MacAddress {
    /// Create a normalized MAC address from any common format.
    /// Accepts colon-separated or dash-separated input.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let normalized = raw.as_ref().trim().to_lowercase().replace('-', ":");
        Self(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hex digits only, used to namespace identifiers (`aabbccddeeff`).
    pub fn compact(&self) -> String {
        self.0.replace(':', "")
    }

    /// True when the value looks like six colon-separated hex octets.
    pub fn is_well_formed(&self) -> bool {
        let octets: Vec<&str> = self.0.split(':').collect();
        octets.len() == 6
            && octets
                .iter()
                .all(|o| o.len() == 2 && o.bytes().all(|b| b.is_ascii_hexdigit()))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MacAddress {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

// ── Domain model ──
//
// Canonical types shared by every layer: entity identity, typed values,
// and the entity record handed from the repository to the mirror and
// the discovery publisher.

pub mod entity;
pub mod entity_key;
pub mod value;

pub use entity::{Entity, Fact};
pub use entity_key::{EntityKey, EntityKind, MacAddress};
pub use value::{EntityValue, StatValue};

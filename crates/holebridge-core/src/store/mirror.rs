// ── State Mirror & Differ ──
//
// Last-published value per entity. The mirror is the only authority on
// whether a value needs publishing: a key present here has had its
// discovery descriptor published, and a `Published` slot holds a value
// the broker accepted.

use std::collections::HashMap;

use tracing::trace;

use crate::model::{Entity, EntityKey, EntityValue};

/// What the mirror holds for one registered entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// Registered, but no value has been published yet (or the last
    /// publish failed). Always differs from a real observation.
    Unseen,
    Published(EntityValue),
}

/// How one observed entity compares against the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    New,
    Changed,
    Unchanged,
}

/// Outcome of reconciling one batch of observations, in observation order.
#[derive(Debug, Default)]
pub struct Reconciliation {
    pub new: Vec<Entity>,
    pub changed: Vec<Entity>,
    pub unchanged: Vec<EntityKey>,
}

impl Reconciliation {
    pub fn is_quiet(&self) -> bool {
        self.new.is_empty() && self.changed.is_empty()
    }
}

/// Keyed by `(kind, id)` so a group and a statistic sharing an id never
/// collide.
#[derive(Debug, Default)]
pub struct StateMirror {
    slots: HashMap<EntityKey, Slot>,
}

impl StateMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `observed` against the mirror and record its value.
    ///
    /// New and changed entities are written; unchanged ones leave the
    /// slot untouched.
    pub fn observe(&mut self, observed: &Entity) -> Observation {
        let outcome = match self.slots.get(&observed.key) {
            None => Observation::New,
            Some(Slot::Unseen) => Observation::Changed,
            Some(Slot::Published(cached)) if cached.same_as(&observed.value) => {
                Observation::Unchanged
            }
            Some(Slot::Published(_)) => Observation::Changed,
        };

        if outcome != Observation::Unchanged {
            self.slots
                .insert(observed.key.clone(), Slot::Published(observed.value.clone()));
        }
        trace!(key = %observed.key, ?outcome, "observed");
        outcome
    }

    /// Split a batch into new, changed and unchanged entities.
    pub fn reconcile(&mut self, observed: &[Entity]) -> Reconciliation {
        let mut result = Reconciliation::default();
        for entity in observed {
            match self.observe(entity) {
                Observation::New => result.new.push(entity.clone()),
                Observation::Changed => result.changed.push(entity.clone()),
                Observation::Unchanged => result.unchanged.push(entity.key.clone()),
            }
        }
        result
    }

    pub fn is_registered(&self, key: &EntityKey) -> bool {
        self.slots.contains_key(key)
    }

    pub fn get(&self, key: &EntityKey) -> Option<&Slot> {
        self.slots.get(key)
    }

    /// Drop a key entirely; it will be rediscovered as new.
    pub fn forget(&mut self, key: &EntityKey) {
        self.slots.remove(key);
    }

    /// Keep the registration but discard the value, so the next
    /// observation counts as changed.
    pub fn mark_unpublished(&mut self, key: &EntityKey) {
        if let Some(slot) = self.slots.get_mut(key) {
            *slot = Slot::Unseen;
        }
    }

    /// Remove everything. Used when the broker session starts over.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Registered keys, sorted for stable output.
    pub fn keys(&self) -> Vec<EntityKey> {
        let mut keys: Vec<EntityKey> = self.slots.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{Fact, StatValue};

    fn stat(id: &str, value: StatValue) -> Entity {
        Entity::from(Fact {
            id: id.into(),
            label: id.replace('_', " "),
            value,
            unit: None,
        })
    }

    fn keys(entities: &[Entity]) -> Vec<String> {
        entities.iter().map(|e| e.key.to_string()).collect()
    }

    #[test]
    fn first_observation_is_new() {
        let mut mirror = StateMirror::new();
        let result = mirror.reconcile(&[Entity::group("BlockAds", false)]);

        assert_eq!(keys(&result.new), vec!["group:BlockAds"]);
        assert!(result.changed.is_empty());
        assert_eq!(
            mirror.get(&EntityKey::group("BlockAds")),
            Some(&Slot::Published(EntityValue::Switch(false)))
        );
    }

    #[test]
    fn reconcile_is_idempotent() {
        let mut mirror = StateMirror::new();
        let batch = vec![
            Entity::group("BlockAds", true),
            stat("CPU_Temp", StatValue::Integer(41)),
        ];
        mirror.reconcile(&batch);
        let second = mirror.reconcile(&batch);

        assert!(second.is_quiet());
        assert_eq!(second.unchanged.len(), 2);
    }

    #[test]
    fn new_then_changed_never_new_again() {
        let mut mirror = StateMirror::new();
        mirror.reconcile(&[stat("Uptime", StatValue::Text("1 day".into()))]);
        let result = mirror.reconcile(&[stat("Uptime", StatValue::Text("2 days".into()))]);

        assert!(result.new.is_empty());
        assert_eq!(keys(&result.changed), vec!["statistic:Uptime"]);
    }

    #[test]
    fn numeric_equality_crosses_representation() {
        let mut mirror = StateMirror::new();
        mirror.reconcile(&[stat("RAM_Usage", StatValue::Integer(50))]);
        let result = mirror.reconcile(&[stat("RAM_Usage", StatValue::Real(50.0))]);
        assert!(result.is_quiet());
    }

    #[test]
    fn unit_only_change_is_not_a_change() {
        let mut mirror = StateMirror::new();
        let mut celsius = stat("CPU_Temp", StatValue::Integer(40));
        celsius.unit = Some("C".into());
        let mut fahrenheit = celsius.clone();
        fahrenheit.unit = Some("F".into());

        mirror.reconcile(&[celsius]);
        assert!(mirror.reconcile(&[fahrenheit]).is_quiet());
    }

    #[test]
    fn unseen_slot_counts_as_changed() {
        let mut mirror = StateMirror::new();
        let entity = Entity::group("BlockAds", true);
        mirror.reconcile(std::slice::from_ref(&entity));
        mirror.mark_unpublished(&entity.key);

        assert_eq!(mirror.get(&entity.key), Some(&Slot::Unseen));
        assert_eq!(mirror.observe(&entity), Observation::Changed);
    }

    #[test]
    fn forget_makes_key_new_again() {
        let mut mirror = StateMirror::new();
        let entity = Entity::group("BlockAds", true);
        mirror.observe(&entity);
        mirror.forget(&entity.key);

        assert!(!mirror.is_registered(&entity.key));
        assert_eq!(mirror.observe(&entity), Observation::New);
    }

    #[test]
    fn groups_and_statistics_do_not_collide() {
        let mut mirror = StateMirror::new();
        let result = mirror.reconcile(&[
            Entity::group("Uptime", true),
            stat("Uptime", StatValue::Integer(3)),
        ]);
        assert_eq!(result.new.len(), 2);
        assert_eq!(mirror.len(), 2);
    }

    #[test]
    fn disappearance_keeps_last_state() {
        let mut mirror = StateMirror::new();
        mirror.reconcile(&[Entity::group("BlockAds", true), Entity::group("BlockKids", false)]);
        let result = mirror.reconcile(&[Entity::group("BlockAds", true)]);

        assert!(result.is_quiet());
        assert!(mirror.is_registered(&EntityKey::group("BlockKids")));
    }

    #[test]
    fn clear_empties_the_mirror() {
        let mut mirror = StateMirror::new();
        mirror.observe(&Entity::blocking(true));
        mirror.clear();
        assert!(mirror.is_empty());
    }
}

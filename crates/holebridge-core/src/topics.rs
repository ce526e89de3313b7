// ── Topic layout ──
//
// The fixed contract with the consuming controller. State and command
// topics derive deterministically from an entity's kind and id; inbound
// topics are classified back into a command target here and nowhere
// else.

use crate::model::{EntityKey, EntityKind};

const BLOCKING_LEAF: &str = "blocking";

/// Node segment of the discovery topic, one per entity family.
fn discovery_node(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Group => "PiHole_groups",
        EntityKind::Blocking => "PiHole",
        EntityKind::Statistic => "PiHole_stats",
    }
}

/// Topic prefixes, without trailing slashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicLayout {
    pub group_state: String,
    pub group_set: String,
    pub global_state: String,
    pub global_set: String,
    pub stat_state: String,
    pub discovery: String,
}

impl Default for TopicLayout {
    fn default() -> Self {
        Self {
            group_state: "pihole/groups/state".into(),
            group_set: "pihole/groups/set".into(),
            global_state: "pihole/state".into(),
            global_set: "pihole/set".into(),
            stat_state: "pihole/stats/state".into(),
            discovery: "homeassistant".into(),
        }
    }
}

/// What an inbound topic addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandTarget {
    Group(String),
    Blocking,
}

impl TopicLayout {
    /// Where the entity's value is published.
    pub fn state_topic(&self, key: &EntityKey) -> String {
        match key.kind {
            EntityKind::Group => format!("{}/{}", self.group_state, key.id),
            EntityKind::Blocking => format!("{}/{BLOCKING_LEAF}", self.global_state),
            EntityKind::Statistic => format!("{}/{}", self.stat_state, key.id),
        }
    }

    /// Where commands for the entity arrive. Statistics are read-only.
    pub fn command_topic(&self, key: &EntityKey) -> Option<String> {
        match key.kind {
            EntityKind::Group => Some(format!("{}/{}", self.group_set, key.id)),
            EntityKind::Blocking => Some(format!("{}/{BLOCKING_LEAF}", self.global_set)),
            EntityKind::Statistic => None,
        }
    }

    /// `<discovery>/<switch|sensor>/<node>/<id>/config`
    pub fn discovery_topic(&self, key: &EntityKey) -> String {
        format!(
            "{}/{}/{}/{}/config",
            self.discovery,
            key.kind.component(),
            discovery_node(key.kind),
            key.id
        )
    }

    /// Filters to subscribe to on every (re)connect.
    pub fn subscriptions(&self) -> Vec<String> {
        vec![
            format!("{}/+", self.group_set),
            format!("{}/{BLOCKING_LEAF}", self.global_set),
        ]
    }

    /// Map an inbound topic to its target. Unknown prefixes yield `None`.
    pub fn classify(&self, topic: &str) -> Option<CommandTarget> {
        if let Some(name) = strip_segment_prefix(topic, &self.group_set) {
            if name.is_empty() || name.contains('/') {
                return None;
            }
            return Some(CommandTarget::Group(name.to_owned()));
        }

        match strip_segment_prefix(topic, &self.global_set) {
            Some(BLOCKING_LEAF) => Some(CommandTarget::Blocking),
            _ => None,
        }
    }
}

/// Strip `prefix/` from `topic`, matching whole segments only.
fn strip_segment_prefix<'a>(topic: &'a str, prefix: &str) -> Option<&'a str> {
    topic.strip_prefix(prefix)?.strip_prefix('/')
}

// ── Fact extraction ──
//
// Pulls typed statistics out of the free-form `pihole -c -e` status
// text. Each rule in the catalog is independent: a rule that does not
// match contributes nothing, and no rule can abort the batch.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::model::{Fact, StatValue};

/// How many fields a rule captures. Fixed per rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    /// Group 1 is the value.
    Value,
    /// Group 1 is the value, group 2 the unit.
    ValueUnit,
}

struct Rule {
    label: &'static str,
    shape: Shape,
    pattern: Regex,
}

impl Rule {
    fn new(label: &'static str, shape: Shape, pattern: &str) -> Self {
        Self {
            label,
            shape,
            // Patterns are literals covered by `every_rule_compiles_with_declared_shape`.
            pattern: Regex::new(pattern).expect("fact rule pattern is valid"),
        }
    }

    fn apply(&self, text: &str) -> Option<Fact> {
        let caps = self.pattern.captures(text)?;
        let raw_value = caps.get(1)?.as_str();
        let unit = match self.shape {
            Shape::Value => None,
            Shape::ValueUnit => caps.get(2).map(|m| clean(m.as_str())),
        };

        Some(Fact {
            id: fact_id(self.label),
            label: self.label.to_owned(),
            value: StatValue::classify(&clean(raw_value)),
            unit,
        })
    }
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    use Shape::{Value, ValueUnit};

    vec![
        Rule::new("Hostname", Value, r"(?:Hostname:) +(\w+)"),
        Rule::new("Uptime", Value, r"(?:Uptime:) +(\d+ [\w,:]+ [\d:]+)"),
        Rule::new("Task Load 1min", Value, r"(?:Task Load:) +([\d.]+)"),
        Rule::new("Task Load 5min", Value, r"(?:Task Load:) +[\d.]+ +([\d.]+)"),
        Rule::new("Task Load 15min", Value, r"(?:Task Load:) +[\d.]+ +[\d.]+ +([\d.]+)"),
        Rule::new("Pihole Active Tasks", Value, r"(?:Active:) +(\d+)"),
        Rule::new("Pihole Total Tasks", Value, r"(?:Active:) +\d+ of (\d+) \w+"),
        Rule::new("CPU Usage", ValueUnit, r"(?:CPU usage:) +(\d+)(%)"),
        Rule::new("CPU Freq", ValueUnit, r"(?:CPU usage: +\d+%) +\((\d+) (\w+)"),
        Rule::new("CPU Temp", ValueUnit, r"(?:CPU usage: +\d+%) +\(\d+ \w+[ @]+(\d+)(\w)"),
        Rule::new("RAM Usage", ValueUnit, r"(?:RAM usage:) +(\d+)(%)"),
        Rule::new("RAM Used", ValueUnit, r"(?:RAM usage: +\d+%) +\(Used: (\d+) +(\w+)"),
        Rule::new("RAM Total", ValueUnit, r"(?:RAM usage: +\d+%) +\(Used: \d+ +\w+ +of +(\d+) +(\w+)"),
        Rule::new("HDD Usage", ValueUnit, r"(?:HDD usage:) +(\d+)(%)"),
        Rule::new("HDD Used", ValueUnit, r"(?:HDD usage: +\d+%) +\(Used: (\d+) +(\w+)"),
        Rule::new("HDD Total", ValueUnit, r"(?:HDD usage: +\d+%) +\(Used: \d+ +\w+ +of +(\d+) +(\w+)"),
        Rule::new("PiHole Status", Value, r"(?:Pi-hole: )(\w+)"),
        Rule::new("Site blocked", Value, r"(?:Blocking: )(\w+)"),
        Rule::new("Request Blocked pct", Value, r"(?:Blocked: )(\w+)"),
        Rule::new("Requests Blocked Total", Value, r"(?:Total: )(\w+)"),
        Rule::new("Requests Total", Value, r"(?:Total: )\w+ +of +(\d+)"),
    ]
});

/// Extract every fact the catalog can find in `text`.
///
/// Total and deterministic: output order follows the catalog, and a
/// fact is present iff its rule matches somewhere in the text.
pub fn extract(text: &str) -> Vec<Fact> {
    RULES
        .iter()
        .filter_map(|rule| {
            let fact = rule.apply(text);
            if fact.is_none() {
                trace!(rule = rule.label, "no match");
            }
            fact
        })
        .collect()
}

/// Labels of every rule in the catalog, in evaluation order.
pub fn catalog() -> impl Iterator<Item = &'static str> {
    RULES.iter().map(|r| r.label)
}

/// Derive the stable statistic id from its label.
pub fn fact_id(label: &str) -> String {
    label.trim().replace(' ', "_")
}

/// Strip non-printable characters (anything outside ASCII `' '..='~'`)
/// and surrounding whitespace.
fn clean(raw: &str) -> String {
    let printable: String = raw.chars().filter(|c| (' '..='~').contains(c)).collect();
    printable.trim().to_owned()
}

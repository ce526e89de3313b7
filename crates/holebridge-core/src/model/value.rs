// ── Typed entity values ──
//
// Statistics arrive as text and are classified once, at extraction
// time, into an explicit tagged union. Comparison and formatting sites
// never re-infer the type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A statistic value after type inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    Integer(i64),
    Real(f64),
    Text(String),
}

impl StatValue {
    /// Classify already-cleaned text.
    ///
    /// `^\d+$` becomes an integer, `^\d+\.\d+$` a real, anything else
    /// (including the empty string) stays text verbatim. Integers that
    /// overflow `i64` stay text.
    pub fn classify(text: &str) -> Self {
        if is_ascii_digits(text) {
            return text
                .parse()
                .map_or_else(|_| Self::Text(text.to_owned()), Self::Integer);
        }

        if let Some((whole, frac)) = text.split_once('.') {
            if is_ascii_digits(whole) && is_ascii_digits(frac) {
                if let Ok(real) = text.parse() {
                    return Self::Real(real);
                }
            }
        }

        Self::Text(text.to_owned())
    }

    /// Value-aware equality: numbers compare numerically across
    /// `Integer` and `Real`, text compares exactly.
    #[allow(clippy::cast_precision_loss, clippy::as_conversions, clippy::float_cmp)]
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Real(a), Self::Real(b)) => a == b,
            (Self::Integer(i), Self::Real(r)) | (Self::Real(r), Self::Integer(i)) => {
                *i as f64 == *r
            }
            (Self::Text(a), Self::Text(b)) => a == b,
            _ => false,
        }
    }
}

fn is_ascii_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Display for StatValue {
    #[allow(clippy::float_cmp)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            // Keep a trailing `.0` so a real never reads back as an integer.
            Self::Real(r) if r.is_finite() && r.fract() == 0.0 => write!(f, "{r:.1}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// The observed value of any entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityValue {
    /// Groups and the blocking switch.
    Switch(bool),
    /// Statistics.
    Stat(StatValue),
}

impl EntityValue {
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Switch(a), Self::Switch(b)) => a == b,
            (Self::Stat(a), Self::Stat(b)) => a.same_as(b),
            _ => false,
        }
    }

    /// Wire payload: switches publish `1`/`0`, statistics their text form.
    pub fn payload(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for EntityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Switch(true) => f.write_str("1"),
            Self::Switch(false) => f.write_str("0"),
            Self::Stat(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for EntityValue {
    fn from(on: bool) -> Self {
        Self::Switch(on)
    }
}

impl From<StatValue> for EntityValue {
    fn from(v: StatValue) -> Self {
        Self::Stat(v)
    }
}

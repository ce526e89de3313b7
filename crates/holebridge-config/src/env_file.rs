// ── key=value environment file ──
//
// A figment provider for `/etc/environment`-style files. Only the broker
// settings are recognised; everything else in the file is ignored.

use std::io::ErrorKind;
use std::path::PathBuf;

use figment::value::{Dict, Map, Tag, Value};
use figment::{Error, Metadata, Profile, Provider, Source};

/// Environment variable names understood in both the file and the
/// process environment, with the `mqtt` field each one sets.
pub const MQTT_KEYS: [(&str, &str); 4] = [
    ("MQTT_SERVER", "host"),
    ("MQTT_PORT", "port"),
    ("MQTT_USER", "username"),
    ("MQTT_PASSWORD", "password"),
];

/// Reads broker settings from a key=value file. A missing file provides
/// nothing.
#[derive(Debug, Clone)]
pub struct EnvFile {
    path: PathBuf,
}

impl EnvFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Provider for EnvFile {
    fn metadata(&self) -> Metadata {
        Metadata::named("environment file").source(Source::File(self.path.clone()))
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "environment file not found");
                return Ok(Map::new());
            }
            Err(e) => {
                return Err(Error::from(format!(
                    "cannot read {}: {e}",
                    self.path.display()
                )));
            }
        };

        let mut mqtt = Dict::new();
        for (key, value) in parse(&text) {
            let Some((_, field)) = MQTT_KEYS.iter().find(|(name, _)| *name == key) else {
                continue;
            };
            let value = if *field == "port" {
                value
                    .parse::<u16>()
                    .map_or_else(|_| Value::from(value.clone()), Value::from)
            } else {
                Value::from(value)
            };
            mqtt.insert((*field).to_owned(), value);
        }

        let mut dict = Dict::new();
        if !mqtt.is_empty() {
            dict.insert("mqtt".to_owned(), Value::Dict(Tag::Default, mqtt));
        }
        Ok(Profile::Default.collect(dict))
    }
}

/// `KEY=value` pairs in file order. Blank lines, comments and lines
/// without `=` are skipped; an optional `export ` prefix and one pair of
/// surrounding quotes are removed.
pub fn parse(text: &str) -> Vec<(String, String)> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_owned(), unquote(value.trim()).to_owned()))
        })
        .collect()
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

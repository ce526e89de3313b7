// ── Entity Repository ──
//
// Data access against the Pi-hole installation: the gravity database
// through `sqlite3` and the `pihole` tool. Callers get normalized
// domain values; exit codes and raw output never leave this module.

use std::collections::BTreeMap;

use tracing::{debug, trace, warn};

use crate::config::{DeviceOverrides, StoreConfig};
use crate::discovery::DeviceIdentity;
use crate::error::CoreError;
use crate::extract;
use crate::model::{Fact, MacAddress};
use crate::runner::{CommandRunner, shell_quote};

/// Minimum pipe-separated columns in a `group` row: id, enabled, name.
const MIN_GROUP_COLUMNS: usize = 3;

/// Reads and mutates Pi-hole state through a [`CommandRunner`].
pub struct PiholeRepository<R> {
    runner: R,
    store: StoreConfig,
}

impl<R: CommandRunner> PiholeRepository<R> {
    pub fn new(runner: R, store: StoreConfig) -> Self {
        Self { runner, store }
    }

    pub fn store_config(&self) -> &StoreConfig {
        &self.store
    }

    // ── Groups ───────────────────────────────────────────────────────

    /// Groups whose name contains `name_filter` (case-insensitive),
    /// mapped to their enabled flag.
    ///
    /// Rows with too few columns or an unreadable enabled flag are
    /// dropped; the rest are still returned.
    pub fn list_groups(&self, name_filter: &str) -> Result<BTreeMap<String, bool>, CoreError> {
        let needle = name_filter.to_lowercase();
        let sql = format!(
            "SELECT * FROM \"group\" WHERE lower(name) LIKE '%{}%';",
            sql_escape(&needle)
        );
        let command = self.sqlite(&sql);
        let output = self.runner.run(&command).check(&command)?;

        let mut groups = BTreeMap::new();
        for line in output.lines() {
            let Some((name, enabled)) = parse_group_row(line) else {
                trace!(row = %line, "dropping malformed group row");
                continue;
            };
            if needle.is_empty() || name.to_lowercase().contains(&needle) {
                groups.insert(name.to_owned(), enabled);
            }
        }

        debug!(count = groups.len(), filter = %name_filter, "listed groups");
        Ok(groups)
    }

    /// Enable or disable a group, then reload the block lists.
    ///
    /// Any output line containing the error marker fails the mutation,
    /// whatever the exit status. The reload is fire-and-forget.
    pub fn set_group_enabled(&self, name: &str, enabled: bool) -> Result<(), CoreError> {
        let sql = format!(
            "UPDATE \"group\" SET enabled = {} WHERE name = '{}';",
            u8::from(enabled),
            sql_escape(name)
        );
        let command = self.sqlite(&sql);
        self.runner.run(&command).check(&command)?;
        debug!(group = %name, enabled, "group updated");

        if self.store.reload_lists {
            self.reload_lists();
        }
        Ok(())
    }

    fn reload_lists(&self) {
        let command = self.pihole("restartdns reload-lists");
        let output = self.runner.run(&command);
        if let Some(line) = output.error_line() {
            warn!(%command, error = %line, "list reload reported an error");
        }
    }

    // ── Global blocking ──────────────────────────────────────────────

    /// Current state of DNS blocking. `None` when the status output
    /// mentions neither state.
    pub fn blocking_status(&self) -> Result<Option<bool>, CoreError> {
        let command = self.pihole("status");
        let output = self.runner.run(&command).check(&command)?;
        Ok(parse_blocking_status(&output.joined()))
    }

    /// Turn DNS blocking on or off.
    pub fn set_blocking(&self, enabled: bool) -> Result<(), CoreError> {
        let verb = if enabled { "enable" } else { "disable" };
        let command = self.pihole(verb);
        self.runner.run(&command).check(&command)?;
        debug!(enabled, "blocking updated");
        Ok(())
    }

    // ── Statistics ───────────────────────────────────────────────────

    /// Facts extracted from the chronometer status text.
    pub fn list_statistics(&self) -> Vec<Fact> {
        let command = self.pihole("-c -e");
        let output = self.runner.run(&command);
        let facts = extract::extract(&output.joined());
        debug!(count = facts.len(), "extracted statistics");
        facts
    }

    // ── Host identity ────────────────────────────────────────────────

    /// Resolve the identity shared by every entity of this process.
    ///
    /// The MAC comes from the default-route interface; overrides win
    /// over detection for every field.
    pub fn detect_identity(&self, overrides: &DeviceOverrides) -> Result<DeviceIdentity, CoreError> {
        let mac = match &overrides.mac {
            Some(mac) => MacAddress::new(mac),
            None => self.detect_mac()?,
        };
        if !mac.is_well_formed() {
            return Err(CoreError::Identity {
                message: format!("'{mac}' is not a MAC address"),
            });
        }

        let sw_version = overrides.sw_version.clone().unwrap_or_else(|| {
            let output = self.runner.run("cat /etc/debian_version");
            match output.first_line().map(str::trim) {
                Some(v) if !v.is_empty() && !output.has_error_marker() && output.exit_ok() => {
                    format!("Debian {v}")
                }
                _ => "unknown".to_owned(),
            }
        });

        let mut identity = DeviceIdentity::new(mac, sw_version);
        if let Some(name) = &overrides.name {
            identity.name.clone_from(name);
        }
        if let Some(manufacturer) = &overrides.manufacturer {
            identity.manufacturer.clone_from(manufacturer);
        }
        if let Some(model) = &overrides.model {
            identity.model.clone_from(model);
        }
        Ok(identity)
    }

    fn detect_mac(&self) -> Result<MacAddress, CoreError> {
        let route = self.runner.run("ip route show default").joined();
        let iface = default_interface(&route).ok_or_else(|| CoreError::Identity {
            message: "no default route interface found".into(),
        })?;

        let command = format!("cat {}", shell_quote(&format!("/sys/class/net/{iface}/address")));
        let output = self.runner.run(&command);
        output
            .first_line()
            .filter(|_| output.exit_ok())
            .map(MacAddress::new)
            .ok_or_else(|| CoreError::Identity {
                message: format!("cannot read link-layer address of {iface}"),
            })
    }

    // ── Command builders ─────────────────────────────────────────────

    fn sqlite(&self, sql: &str) -> String {
        format!(
            "{} {} {}",
            shell_quote(&self.store.sqlite_bin.to_string_lossy()),
            shell_quote(&self.store.gravity_db.to_string_lossy()),
            shell_quote(sql)
        )
    }

    fn pihole(&self, args: &str) -> String {
        format!("{} {args}", shell_quote(&self.store.pihole_bin.to_string_lossy()))
    }
}

/// `id|enabled|name|...` → `(name, enabled)`.
fn parse_group_row(line: &str) -> Option<(&str, bool)> {
    let columns: Vec<&str> = line.split('|').collect();
    if columns.len() < MIN_GROUP_COLUMNS {
        return None;
    }
    let enabled = match columns.get(1)?.trim() {
        "1" => true,
        "0" => false,
        _ => return None,
    };
    let name = *columns.get(2)?;
    if name.is_empty() {
        return None;
    }
    Some((name, enabled))
}

/// `enabled` is checked before `disabled`.
fn parse_blocking_status(text: &str) -> Option<bool> {
    let lower = text.to_lowercase();
    if lower.contains("enabled") {
        Some(true)
    } else if lower.contains("disabled") {
        Some(false)
    } else {
        None
    }
}

/// Interface name following `dev` in `ip route` output.
fn default_interface(route: &str) -> Option<&str> {
    let mut tokens = route.split_whitespace();
    tokens.find(|t| *t == "dev")?;
    tokens.next().filter(|iface| !iface.contains('/'))
}

fn sql_escape(value: &str) -> String {
    value.replace('\'', "''")
}

//! `holebridge inspect`: one-shot read of everything the bridge exposes.
//!
//! Goes through the same repository the service uses, so a failing read
//! here (typically gravity.db permissions) fails the same way in `run`.

use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use holebridge_config::Config;
use holebridge_core::{DeviceIdentity, Fact, PiholeRepository, ShellRunner};

use crate::cli::InspectArgs;
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct Snapshot {
    device: Option<DeviceView>,
    groups: Vec<GroupView>,
    blocking: Option<bool>,
    statistics: Vec<Fact>,
}

#[derive(Debug, Serialize)]
struct DeviceView {
    mac: String,
    sw_version: String,
    name: String,
}

impl From<DeviceIdentity> for DeviceView {
    fn from(identity: DeviceIdentity) -> Self {
        Self {
            mac: identity.mac.to_string(),
            sw_version: identity.sw_version,
            name: identity.name,
        }
    }
}

#[derive(Debug, Serialize)]
struct GroupView {
    name: String,
    enabled: bool,
}

#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "Group")]
    name: String,
    #[tabled(rename = "Enabled")]
    enabled: &'static str,
}

#[derive(Tabled)]
struct StatRow {
    #[tabled(rename = "Statistic")]
    id: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Unit")]
    unit: String,
}

pub async fn handle(args: InspectArgs, config: Config) -> Result<(), CliError> {
    let store = config.store_config();
    let overrides = config.device_overrides();

    let snapshot = tokio::task::spawn_blocking(move || -> Result<Snapshot, CliError> {
        let repo = PiholeRepository::new(ShellRunner::default(), store);
        let device = match repo.detect_identity(&overrides) {
            Ok(identity) => Some(DeviceView::from(identity)),
            Err(e) => {
                tracing::warn!(error = %e, "device identity unavailable");
                None
            }
        };
        let groups = repo
            .list_groups(&repo.store_config().group_filter)?
            .into_iter()
            .map(|(name, enabled)| GroupView { name, enabled })
            .collect();
        Ok(Snapshot {
            device,
            groups,
            blocking: repo.blocking_status()?,
            statistics: repo.list_statistics(),
        })
    })
    .await
    .map_err(|e| CliError::Io(std::io::Error::other(e)))??;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!("{}", render(&snapshot));
    }
    Ok(())
}

fn render(snapshot: &Snapshot) -> String {
    let mut out = String::new();

    if let Some(device) = &snapshot.device {
        out.push_str(&format!(
            "Device:   {} ({}, {})\n",
            device.name, device.mac, device.sw_version
        ));
    }
    let blocking = match snapshot.blocking {
        Some(true) => "enabled",
        Some(false) => "disabled",
        None => "unknown",
    };
    out.push_str(&format!("Blocking: {blocking}\n\n"));

    if snapshot.groups.is_empty() {
        out.push_str("No matching groups.\n\n");
    } else {
        let rows: Vec<GroupRow> = snapshot
            .groups
            .iter()
            .map(|g| GroupRow {
                name: g.name.clone(),
                enabled: if g.enabled { "yes" } else { "no" },
            })
            .collect();
        out.push_str(&Table::new(rows).with(Style::rounded()).to_string());
        out.push_str("\n\n");
    }

    let stats: Vec<StatRow> = snapshot
        .statistics
        .iter()
        .map(|fact| StatRow {
            id: fact.id.clone(),
            value: fact.value.to_string(),
            unit: fact.unit.clone().unwrap_or_default(),
        })
        .collect();
    if stats.is_empty() {
        out.push_str("No statistics available.");
    } else {
        out.push_str(&Table::new(stats).with(Style::rounded()).to_string());
    }
    out
}

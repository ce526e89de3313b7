//! Clap derive structures for the `holebridge` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// holebridge -- Pi-hole state on an MQTT bus
#[derive(Debug, Parser)]
#[command(
    name = "holebridge",
    version,
    about = "Bridge Pi-hole groups and statistics to Home Assistant over MQTT",
    long_about = "Polls a local Pi-hole installation and publishes its groups, global\n\
        blocking switch and statistics as Home Assistant MQTT discovery entities.\n\
        Switch commands received on the bus are applied back to Pi-hole.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// TOML configuration file (default: platform config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// key=value file holding MQTT_SERVER, MQTT_PORT, MQTT_USER, MQTT_PASSWORD
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        default_value = holebridge_config::DEFAULT_ENV_FILE
    )]
    pub env_file: PathBuf,

    /// Increase verbosity (-v, -vv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the bridge until interrupted
    Run(RunArgs),

    /// Print what the bridge would publish, without connecting to a broker
    Inspect(InspectArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Seconds between polls (overrides configuration)
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Emit JSON instead of tables
    #[arg(long)]
    pub json: bool,
}

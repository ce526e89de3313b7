//! `holebridge run`: serve until interrupted.

use tracing::info;

use holebridge_config::Config;
use holebridge_core::{Service, ShellRunner};

use crate::cli::{GlobalOpts, RunArgs};
use crate::error::CliError;

pub async fn handle(args: RunArgs, config: Config, global: &GlobalOpts) -> Result<(), CliError> {
    let mut config = config;
    if let Some(interval) = args.interval {
        config.poll_interval_secs = interval;
    }
    let bridge_config = config
        .to_bridge_config()
        .map_err(|e| CliError::from_config(e, &global.env_file))?;

    let service = Service::new(bridge_config);
    let cancel = service.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            cancel.cancel();
        }
    });

    service.run(ShellRunner::default()).await?;
    Ok(())
}

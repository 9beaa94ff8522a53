//! The `portal` binary's building blocks: command line, logger setup,
//! configuration loading, the catalog reverse proxy and the commands.
pub mod cli;
pub mod platform;

use anyhow::Result;

use crate::cli::Cli;
use crate::platform::logging::{self, LogDestination};

pub async fn run(cli: Cli) -> Result<()> {
    let destination = if cli.log_file {
        LogDestination::Both
    } else {
        LogDestination::Terminal
    };
    logging::initialize(destination, logging::level_for_verbosity(cli.verbose));

    let config = platform::settings::load_config(cli.config.as_deref())?;
    platform::commands::run(cli.command, config).await
}

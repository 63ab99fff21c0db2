// SPDX-License-Identifier: MPL-2.0
use medsr::app::{self, commands, paths, Flags};
use medsr::config;
use std::process::ExitCode;
use tracing::{error, warn};

fn main() -> ExitCode {
    let flags = match Flags::from_env() {
        Ok(flags) => flags,
        Err(err) => {
            eprintln!("{err}\n\n{}", app::HELP);
            return ExitCode::from(2);
        }
    };

    if let Err(err) = paths::init_cli_overrides(flags.data_dir.clone(), flags.config_dir.clone()) {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    let (config, warning) = config::load();
    app::init_tracing(&config.logging.filter);
    if let Some(warning) = warning {
        warn!("{warning}");
    }

    let config = config.resolved_against(&paths::data_dir_or_current());
    match commands::run(&flags.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(kind = ?err.kind(), "{err}");
            ExitCode::FAILURE
        }
    }
}

// SPDX-License-Identifier: MPL-2.0
//! Command-line front end.
//!
//! Parses [`Flags`] with `pico-args`, installs the `tracing` subscriber and
//! dispatches to the [`commands`] handlers. Directory resolution lives in
//! [`paths`].

pub mod commands;
pub mod paths;

use crate::domain::modality::Modality;
use crate::error::{Error, Result};
use std::ffi::OsString;
use std::path::PathBuf;

/// Usage text printed by `--help`.
pub const HELP: &str = "\
medsr - modality-adaptive medical image super-resolution

USAGE:
  medsr [OPTIONS] <COMMAND>

COMMANDS:
  enhance <PATH> [--modality M] [--out DIR]   Enhance one image
  build-dataset [--modality M]                Build training patch shards
  check-model <MODALITY>                      Load and validate a checkpoint

OPTIONS:
  --data-dir DIR     Data directory (checkpoints, uploads, results, dataset)
  --config-dir DIR   Directory containing settings.toml
  -h, --help         Print this help

MODALITIES: xray, ct, mri
";

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flags {
    /// Takes precedence over `MEDSR_DATA_DIR`.
    pub data_dir: Option<String>,
    /// Takes precedence over `MEDSR_CONFIG_DIR`.
    pub config_dir: Option<String>,
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Enhance a single image file.
    Enhance {
        path: PathBuf,
        /// Explicit modality; otherwise inferred from the file name.
        modality: Option<Modality>,
        /// Output directory; defaults to the configured results directory.
        out_dir: Option<PathBuf>,
    },
    /// Build one shard, or all shards whose source folder exists.
    BuildDataset { modality: Option<Modality> },
    /// Load a modality's checkpoint and run a validation inference.
    CheckModel { modality: Modality },
    Help,
}

fn usage_error(err: pico_args::Error) -> Error {
    Error::Config(format!("invalid arguments: {err}"))
}

impl Flags {
    /// Parses the process arguments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for unknown commands, missing or malformed
    /// values, and leftover arguments.
    pub fn from_env() -> Result<Self> {
        Self::parse(pico_args::Arguments::from_env())
    }

    /// Parses arguments, excluding the program name.
    ///
    /// # Errors
    ///
    /// See [`Flags::from_env`].
    pub fn from_vec(args: Vec<OsString>) -> Result<Self> {
        Self::parse(pico_args::Arguments::from_vec(args))
    }

    fn parse(mut args: pico_args::Arguments) -> Result<Self> {
        let help = args.contains(["-h", "--help"]);
        let data_dir = args.opt_value_from_str("--data-dir").map_err(usage_error)?;
        let config_dir = args.opt_value_from_str("--config-dir").map_err(usage_error)?;

        let subcommand = args.subcommand().map_err(usage_error)?;
        let command = match (help, subcommand.as_deref()) {
            (true, _) | (false, None) => Command::Help,
            (false, Some("enhance")) => {
                let modality = args.opt_value_from_str("--modality").map_err(usage_error)?;
                let out_dir: Option<PathBuf> =
                    args.opt_value_from_str("--out").map_err(usage_error)?;
                let path: PathBuf = args.free_from_str().map_err(usage_error)?;
                Command::Enhance {
                    path,
                    modality,
                    out_dir,
                }
            }
            (false, Some("build-dataset")) => Command::BuildDataset {
                modality: args.opt_value_from_str("--modality").map_err(usage_error)?,
            },
            (false, Some("check-model")) => Command::CheckModel {
                modality: args.free_from_str().map_err(usage_error)?,
            },
            (false, Some(other)) => {
                return Err(Error::Config(format!("unknown command: {other}")));
            }
        };

        let remaining = args.finish();
        if !remaining.is_empty() {
            return Err(Error::Config(format!(
                "unexpected arguments: {remaining:?}"
            )));
        }

        Ok(Self {
            data_dir,
            config_dir,
            command,
        })
    }
}

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` wins over `default_filter`. Does nothing if a subscriber is
/// already installed.
pub fn init_tracing(default_filter: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

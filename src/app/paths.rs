// SPDX-License-Identifier: MPL-2.0
//! Locations of medsr's files on disk.
//!
//! Two roots are resolved at startup:
//!
//! - the data root anchors every relative directory of `settings.toml`:
//!   `checkpoints/<modality>/SRCNN_<modality>.*`, `uploads/`, `results/`,
//!   the `dataset/` source tree and the `preprocessed_data/` shards
//! - the config root holds `settings.toml` itself
//!
//! Each root is taken from the first source that names one: an explicit path
//! passed by the caller, `--data-dir` / `--config-dir`, `MEDSR_DATA_DIR` /
//! `MEDSR_CONFIG_DIR` (ignored when empty), then the platform data or config
//! directory with `medsr` appended. Absolute directories in the config are
//! used as written.

use crate::error::{Error, Result};
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const APP_NAME: &str = "medsr";

/// Environment variable naming the data root.
pub const ENV_DATA_DIR: &str = "MEDSR_DATA_DIR";

/// Environment variable naming the config root.
pub const ENV_CONFIG_DIR: &str = "MEDSR_CONFIG_DIR";

static CLI_DATA_DIR: OnceLock<Option<PathBuf>> = OnceLock::new();
static CLI_CONFIG_DIR: OnceLock<Option<PathBuf>> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Root {
    Data,
    Config,
}

impl Root {
    const fn env_var(self) -> &'static str {
        match self {
            Root::Data => ENV_DATA_DIR,
            Root::Config => ENV_CONFIG_DIR,
        }
    }

    fn cli_value(self) -> Option<PathBuf> {
        let cell = match self {
            Root::Data => &CLI_DATA_DIR,
            Root::Config => &CLI_CONFIG_DIR,
        };
        cell.get().and_then(Clone::clone)
    }

    fn platform(self) -> Option<PathBuf> {
        let base = match self {
            Root::Data => dirs::data_dir(),
            Root::Config => dirs::config_dir(),
        };
        base.map(|dir| dir.join(APP_NAME))
    }

    fn resolve(self, explicit: Option<PathBuf>) -> Option<PathBuf> {
        first_root(
            explicit,
            self.cli_value(),
            env::var_os(self.env_var()),
            || self.platform(),
        )
    }
}

/// Earlier sources win; an empty environment value counts as unset.
fn first_root(
    explicit: Option<PathBuf>,
    cli: Option<PathBuf>,
    env_value: Option<OsString>,
    platform: impl FnOnce() -> Option<PathBuf>,
) -> Option<PathBuf> {
    explicit
        .or(cli)
        .or_else(|| env_value.filter(|v| !v.is_empty()).map(PathBuf::from))
        .or_else(platform)
}

/// Records `--data-dir` and `--config-dir` for the rest of the process.
///
/// # Errors
///
/// Returns [`Error::Config`] when called a second time.
pub fn init_cli_overrides(data_dir: Option<String>, config_dir: Option<String>) -> Result<()> {
    let already_set = |flag: &str| Error::Config(format!("{flag} was already applied"));
    CLI_DATA_DIR
        .set(data_dir.map(PathBuf::from))
        .map_err(|_| already_set("--data-dir"))?;
    CLI_CONFIG_DIR
        .set(config_dir.map(PathBuf::from))
        .map_err(|_| already_set("--config-dir"))?;
    Ok(())
}

/// Returns the data root, if any source names one.
#[must_use]
pub fn data_dir() -> Option<PathBuf> {
    Root::Data.resolve(None)
}

/// Returns the data root, falling back to the working directory.
#[must_use]
pub fn data_dir_or_current() -> PathBuf {
    data_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the directory holding `settings.toml`; `explicit` wins over every
/// other source.
#[must_use]
pub fn config_dir_with_override(explicit: Option<PathBuf>) -> Option<PathBuf> {
    Root::Config.resolve(explicit)
}

/// Places a configured directory under the data root unless it is absolute.
#[must_use]
pub fn under_data_root(root: &Path, dir: &Path) -> PathBuf {
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        root.join(dir)
    }
}

// SPDX-License-Identifier: MPL-2.0
//! This module handles the application's configuration, loaded from and saved
//! to a `settings.toml` file.
//!
//! # Configuration Sections
//!
//! - `[storage]` - Checkpoint, upload and result directories
//! - `[model]` - Inference backend and runtime threads
//! - `[dataset]` - Dataset source, output and augmentation seed
//! - `[logging]` - Default `tracing` filter
//!
//! Relative directories are resolved against the application data directory,
//! so a bare `checkpoints` means `<data dir>/checkpoints`.
//!
//! # Path Resolution
//!
//! The config file location can be customized for testing or portable deployments:
//! 1. Use `load_from_path()`/`save_to_path()` with explicit path
//! 2. Pass `--config-dir` or set `MEDSR_CONFIG_DIR`
//! 3. Falls back to platform-specific config directory
//!
//! # Examples
//!
//! ```no_run
//! use medsr::config::{self, Config};
//! use medsr::model::InferenceBackend;
//!
//! let (mut config, _warning) = config::load();
//! config.model.backend = InferenceBackend::Onnx;
//! config::save(&config).expect("Failed to save config");
//! ```

pub mod defaults;

pub use defaults::*;

use crate::app::paths;
use crate::error::{Error, Result};
use crate::model::InferenceBackend;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "settings.toml";

// =============================================================================
// Section Structs
// =============================================================================

/// Where weights, uploads and outputs live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    #[serde(default = "default_checkpoints_dir")]
    pub checkpoints_dir: PathBuf,

    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,

    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            checkpoints_dir: default_checkpoints_dir(),
            uploads_dir: default_uploads_dir(),
            results_dir: default_results_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelConfig {
    /// Checkpoint format: `native` (`.cbor`) or `onnx` (`.onnx`).
    #[serde(default)]
    pub backend: InferenceBackend,

    #[serde(
        default = "default_onnx_intra_threads",
        skip_serializing_if = "Option::is_none"
    )]
    pub onnx_intra_threads: Option<usize>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: InferenceBackend::default(),
            onnx_intra_threads: default_onnx_intra_threads(),
        }
    }
}

impl ModelConfig {
    /// Intra-op thread count, clamped to [`MAX_ONNX_INTRA_THREADS`].
    #[must_use]
    pub fn intra_threads(&self) -> usize {
        self.onnx_intra_threads
            .unwrap_or(DEFAULT_ONNX_INTRA_THREADS)
            .min(MAX_ONNX_INTRA_THREADS)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatasetConfig {
    #[serde(default = "default_dataset_root")]
    pub root: PathBuf,

    #[serde(default = "default_dataset_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_noise_seed")]
    pub seed: u64,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            root: default_dataset_root(),
            output_dir: default_dataset_output_dir(),
            seed: DEFAULT_NOISE_SEED,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

// =============================================================================
// Main Config Struct (Sectioned)
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub dataset: DatasetConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Returns a copy with every relative directory joined onto `base`.
    #[must_use]
    pub fn resolved_against(&self, base: &Path) -> Self {
        let resolve = |path: &PathBuf| paths::under_data_root(base, path);
        Self {
            storage: StorageConfig {
                checkpoints_dir: resolve(&self.storage.checkpoints_dir),
                uploads_dir: resolve(&self.storage.uploads_dir),
                results_dir: resolve(&self.storage.results_dir),
            },
            dataset: DatasetConfig {
                root: resolve(&self.dataset.root),
                output_dir: resolve(&self.dataset.output_dir),
                seed: self.dataset.seed,
            },
            model: self.model.clone(),
            logging: self.logging.clone(),
        }
    }
}

// =============================================================================
// Default Value Functions
// =============================================================================

fn default_checkpoints_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CHECKPOINTS_DIR)
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from(DEFAULT_UPLOADS_DIR)
}

fn default_results_dir() -> PathBuf {
    PathBuf::from(DEFAULT_RESULTS_DIR)
}

fn default_dataset_root() -> PathBuf {
    PathBuf::from(DEFAULT_DATASET_ROOT)
}

fn default_dataset_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATASET_OUTPUT_DIR)
}

fn default_noise_seed() -> u64 {
    DEFAULT_NOISE_SEED
}

fn default_onnx_intra_threads() -> Option<usize> {
    Some(DEFAULT_ONNX_INTRA_THREADS)
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

// =============================================================================
// Config Path Resolution
// =============================================================================

fn get_config_path_with_override(base_dir: Option<PathBuf>) -> Option<PathBuf> {
    paths::config_dir_with_override(base_dir).map(|mut path| {
        path.push(CONFIG_FILE);
        path
    })
}

// =============================================================================
// Load Functions
// =============================================================================

/// Loads the configuration from the default location.
///
/// Returns the defaults and a warning message if the file exists but cannot
/// be parsed. A missing file silently yields the defaults.
pub fn load() -> (Config, Option<String>) {
    load_with_override(None)
}

/// Loads the configuration from `<base_dir>/settings.toml`, or the default
/// location when `base_dir` is `None`.
pub fn load_with_override(base_dir: Option<PathBuf>) -> (Config, Option<String>) {
    if let Some(path) = get_config_path_with_override(base_dir) {
        if path.exists() {
            match load_from_path(&path) {
                Ok(config) => return (config, None),
                Err(err) => {
                    return (
                        Config::default(),
                        Some(format!("{} ignored: {err}", path.display())),
                    );
                }
            }
        }
    }
    (Config::default(), None)
}

/// Loads the configuration from an explicit file.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read and [`Error::Config`] if
/// it is not valid TOML for [`Config`].
pub fn load_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}

// =============================================================================
// Save Functions
// =============================================================================

/// Saves the configuration to the default location.
///
/// # Errors
///
/// See [`save_to_path`].
pub fn save(config: &Config) -> Result<()> {
    save_with_override(config, None)
}

/// Saves the configuration to `<base_dir>/settings.toml`, or the default
/// location when `base_dir` is `None`.
///
/// # Errors
///
/// See [`save_to_path`].
pub fn save_with_override(config: &Config, base_dir: Option<PathBuf>) -> Result<()> {
    if let Some(path) = get_config_path_with_override(base_dir) {
        return save_to_path(config, &path);
    }
    Ok(())
}

/// Saves the configuration to an explicit file, creating parent directories.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be written.
pub fn save_to_path(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config).map_err(Error::from)?;
    fs::write(path, content)?;
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

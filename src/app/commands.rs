// SPDX-License-Identifier: MPL-2.0
//! Handlers for the command-line commands.
//!
//! Each handler takes a [`Config`] whose directories are already resolved
//! and reports results on stdout; diagnostics go through `tracing`.

use super::Command;
use crate::application::{CheckpointLoader, EnhancementPipeline, ModelLoader, ModelRegistry};
use crate::application::service::ENHANCED_PREFIX;
use crate::config::Config;
use crate::dataset::{BuildSummary, DatasetBuilder};
use crate::domain::modality::Modality;
use crate::error::{Error, Result};
use crate::model::validate_model;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Runs `command` against `config`.
///
/// # Errors
///
/// Returns the error of the failed command.
pub fn run(command: &Command, config: &Config) -> Result<()> {
    match command {
        Command::Help => {
            print!("{}", super::HELP);
            Ok(())
        }
        Command::Enhance {
            path,
            modality,
            out_dir,
        } => {
            let output = enhance(path, *modality, out_dir.as_deref(), config)?;
            println!("{}", output.display());
            Ok(())
        }
        Command::BuildDataset { modality } => {
            for summary in build_dataset(*modality, config)? {
                println!(
                    "{}: {} images ({} skipped), {} patches -> {}",
                    summary.modality.label(),
                    summary.images_seen,
                    summary.images_skipped,
                    summary.patches,
                    summary.shard_path.display()
                );
            }
            Ok(())
        }
        Command::CheckModel { modality } => {
            let report = check_model(*modality, config)?;
            println!("{report}");
            Ok(())
        }
    }
}

fn loader_for(config: &Config) -> CheckpointLoader {
    CheckpointLoader::new(&config.storage.checkpoints_dir, config.model.backend)
        .with_intra_threads(config.model.intra_threads())
}

/// Enhances one file and returns the path of the written output.
///
/// Without an explicit modality the file name must contain a modality token;
/// unlike the upload boundary this tool does not fall back to X-ray.
///
/// # Errors
///
/// Returns [`Error::Config`] if no modality can be determined, and any
/// pipeline error otherwise.
pub fn enhance(
    path: &Path,
    modality: Option<Modality>,
    out_dir: Option<&Path>,
    config: &Config,
) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let modality = modality
        .or_else(|| Modality::from_path_tokens(file_name))
        .ok_or_else(|| {
            Error::Config(format!(
                "cannot infer modality from '{file_name}'; pass --modality xray|ct|mri"
            ))
        })?;

    let registry = Arc::new(ModelRegistry::new(loader_for(config)));
    let enhanced = EnhancementPipeline::new(registry).enhance_file(path, modality)?;

    let out_dir = out_dir.unwrap_or(&config.storage.results_dir);
    fs::create_dir_all(out_dir)?;
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    let output = out_dir.join(format!("{ENHANCED_PREFIX}{stem}.png"));
    enhanced.save(&output)?;
    info!(modality = %modality, output = %output.display(), "wrote enhanced image");
    Ok(output)
}

/// Builds one shard, or every shard whose source folder exists.
///
/// # Errors
///
/// See [`DatasetBuilder::build_modality`] and [`DatasetBuilder::build_all`].
pub fn build_dataset(modality: Option<Modality>, config: &Config) -> Result<Vec<BuildSummary>> {
    let builder = DatasetBuilder::new(&config.dataset.root, &config.dataset.output_dir)
        .with_seed(config.dataset.seed);
    match modality {
        Some(modality) => Ok(vec![builder.build_modality(modality)?]),
        None => builder.build_all(),
    }
}

/// Loads a checkpoint, validates it and describes it.
///
/// # Errors
///
/// Returns [`Error::CheckpointNotFound`] if no checkpoint exists and
/// [`Error::Model`] if it fails to load or validate.
pub fn check_model(modality: Modality, config: &Config) -> Result<String> {
    let loader = loader_for(config);
    let model = loader.load(modality)?;
    validate_model(model.as_ref())?;

    let caps = model.capabilities();
    Ok(format!(
        "{}: {} ({}, {}) at {} checksum {}",
        modality.label(),
        caps.name,
        caps.backend,
        caps.device,
        loader.path_for(modality).display(),
        caps.checksum.as_deref().unwrap_or("-")
    ))
}

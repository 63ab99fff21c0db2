// SPDX-License-Identifier: MPL-2.0
//! Offline construction of the per-modality training patch shards.
//!
//! For every source image under `<root>/<Folder>` the builder canonicalizes
//! it, expands it into the modality's augmentation variants, degrades each
//! variant into its low-resolution partner and tiles both into aligned
//! 64×64 patches. The pairs of one modality are written to
//! `train_<modality>.cbor`.
//!
//! Images that cannot be decoded are logged and skipped. Per-image work runs
//! on the rayon pool; the noise augmentation draws from a generator seeded by
//! the configured seed and the image's position in the sorted file list, so a
//! build is reproducible regardless of scheduling.

pub mod shard;

pub use shard::{shard_filename, shard_path, PatchShard};

use crate::domain::image::PATCH_SIZE;
use crate::domain::modality::Modality;
use crate::error::{Error, Result};
use crate::media::{augment, canonicalize, degrade, tile_pairs};
use image_rs::GrayImage;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Seed used when none is configured.
pub const DEFAULT_SEED: u64 = 42;

/// Outcome of building one modality shard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub modality: Modality,
    /// Files found in the modality folder.
    pub images_seen: usize,
    /// Files that could not be decoded.
    pub images_skipped: usize,
    /// Patch pairs written.
    pub patches: usize,
    pub shard_path: PathBuf,
}

/// Builds training shards from a directory tree with one folder per modality.
#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    root: PathBuf,
    output_dir: PathBuf,
    seed: u64,
    patch_size: u32,
}

impl DatasetBuilder {
    pub fn new(root: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            output_dir: output_dir.into(),
            seed: DEFAULT_SEED,
            patch_size: PATCH_SIZE,
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_patch_size(mut self, patch_size: u32) -> Self {
        self.patch_size = patch_size;
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Source folder for a modality.
    #[must_use]
    pub fn source_dir(&self, modality: Modality) -> PathBuf {
        self.root.join(modality.dataset_folder())
    }

    /// Builds every modality whose source folder exists.
    ///
    /// Missing folders are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns the first error that aborts a modality build (listing its
    /// folder or writing its shard).
    pub fn build_all(&self) -> Result<Vec<BuildSummary>> {
        let mut summaries = Vec::with_capacity(Modality::ALL.len());
        for modality in Modality::ALL {
            let source = self.source_dir(modality);
            if !source.is_dir() {
                warn!(
                    modality = %modality,
                    path = %source.display(),
                    "dataset folder missing, skipping modality"
                );
                continue;
            }
            summaries.push(self.build_modality(modality)?);
        }
        Ok(summaries)
    }

    /// Builds and writes the shard of one modality.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dataset`] if the source folder is missing and
    /// [`Error::Io`] if it cannot be listed or the shard cannot be written.
    pub fn build_modality(&self, modality: Modality) -> Result<BuildSummary> {
        let source = self.source_dir(modality);
        if !source.is_dir() {
            return Err(Error::Dataset(format!(
                "dataset folder not found: {}",
                source.display()
            )));
        }

        let files = list_files(&source)?;
        info!(
            modality = %modality,
            images = files.len(),
            "building training patches"
        );

        let results: Vec<Option<Vec<(GrayImage, GrayImage)>>> = files
            .par_iter()
            .enumerate()
            .map(|(index, path)| {
                let mut rng = self.rng_for(index);
                match process_image(path, modality, self.patch_size, &mut rng) {
                    Ok(pairs) => {
                        debug!(path = %path.display(), patches = pairs.len(), "processed image");
                        Some(pairs)
                    }
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "skipping unreadable image");
                        None
                    }
                }
            })
            .collect();

        let images_skipped = results.iter().filter(|r| r.is_none()).count();
        let pairs: Vec<(GrayImage, GrayImage)> = results.into_iter().flatten().flatten().collect();

        let shard = PatchShard::from_pairs(modality, self.patch_size, &pairs)?;
        let path = shard_path(&self.output_dir, modality);
        shard.save(&path)?;

        info!(
            modality = %modality,
            patches = shard.len(),
            skipped = images_skipped,
            path = %path.display(),
            "wrote training shard"
        );

        Ok(BuildSummary {
            modality,
            images_seen: files.len(),
            images_skipped,
            patches: shard.len(),
            shard_path: path,
        })
    }

    fn rng_for(&self, index: usize) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        rng.set_stream(index as u64);
        rng
    }
}

/// Turns one source image into its aligned HR/LR patch pairs.
///
/// # Errors
///
/// Returns the normalizer's error if the file cannot be decoded.
pub fn process_image<R: Rng + ?Sized>(
    path: &Path,
    modality: Modality,
    patch_size: u32,
    rng: &mut R,
) -> Result<Vec<(GrayImage, GrayImage)>> {
    let canonical = canonicalize(path)?;
    let pairs = augment(canonical.as_gray(), modality, rng)
        .into_iter()
        .flat_map(|hr| {
            let lr = degrade(&hr);
            tile_pairs(&hr, &lr, patch_size)
        })
        .collect();
    Ok(pairs)
}

/// Regular files directly inside `dir`, sorted by path.
fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

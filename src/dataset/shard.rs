// SPDX-License-Identifier: MPL-2.0
//! Per-modality patch shard persisted as CBOR.

use crate::domain::modality::Modality;
use crate::error::{Error, Result};
use image_rs::GrayImage;
use ndarray::{Array3, Axis};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Returns the shard file name for a modality, e.g. `train_ct.cbor`.
#[must_use]
pub fn shard_filename(modality: Modality) -> String {
    format!("train_{}.cbor", modality.as_str())
}

/// Returns the shard path for a modality under `output_dir`.
#[must_use]
pub fn shard_path(output_dir: &Path, modality: Modality) -> PathBuf {
    output_dir.join(shard_filename(modality))
}

/// Aligned HR/LR training patches for one modality.
///
/// `hr` and `lr` both have shape `[N, patch_size, patch_size]` with values
/// in `[0, 1]`; index `i` of each forms one training pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchShard {
    pub modality: Modality,
    pub patch_size: u32,
    pub hr: Array3<f32>,
    pub lr: Array3<f32>,
}

impl PatchShard {
    /// Builds a shard from 8-bit patch pairs, scaling intensities by 1/255.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dataset`] if any patch is not `patch_size` square.
    pub fn from_pairs(
        modality: Modality,
        patch_size: u32,
        pairs: &[(GrayImage, GrayImage)],
    ) -> Result<Self> {
        let side = patch_size as usize;
        let mut hr = Array3::<f32>::zeros((pairs.len(), side, side));
        let mut lr = Array3::<f32>::zeros((pairs.len(), side, side));

        for (index, (hr_patch, lr_patch)) in pairs.iter().enumerate() {
            for (patch, target) in [(hr_patch, &mut hr), (lr_patch, &mut lr)] {
                if patch.dimensions() != (patch_size, patch_size) {
                    return Err(Error::Dataset(format!(
                        "patch {index} is {}x{}, expected {patch_size}x{patch_size}",
                        patch.width(),
                        patch.height()
                    )));
                }
                let mut slot = target.index_axis_mut(Axis(0), index);
                for (x, y, pixel) in patch.enumerate_pixels() {
                    slot[[y as usize, x as usize]] = f32::from(pixel.0[0]) / 255.0;
                }
            }
        }

        Ok(Self {
            modality,
            patch_size,
            hr,
            lr,
        })
    }

    /// Number of patch pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hr.len_of(Axis(0))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes the shard, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be written and
    /// [`Error::Dataset`] if encoding fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        ciborium::into_writer(self, writer)
            .map_err(|e| Error::Dataset(format!("failed to encode shard: {e}")))
    }

    /// Reads a shard written by [`PatchShard::save`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read and
    /// [`Error::Dataset`] if it is not a valid shard.
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let shard: Self = ciborium::from_reader(reader)
            .map_err(|e| Error::Dataset(format!("failed to decode shard: {e}")))?;
        if shard.hr.shape() != shard.lr.shape() {
            return Err(Error::Dataset(format!(
                "hr {:?} and lr {:?} collections are not aligned",
                shard.hr.shape(),
                shard.lr.shape()
            )));
        }
        Ok(shard)
    }
}

// SPDX-License-Identifier: MPL-2.0
//! Checkpoint layout, serialization and integrity.
//!
//! Each modality has exactly one checkpoint at
//! `<checkpoints_dir>/<modality>/SRCNN_<modality>.<ext>`, where the extension
//! depends on the [`InferenceBackend`]. Native checkpoints are a CBOR map from
//! state-dict name to tensor.

use crate::application::port::ai::{ModelError, ModelResult};
use crate::domain::modality::Modality;
use crate::model::InferenceBackend;
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Ordered mapping from layer identifier to weight tensor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateDict(BTreeMap<String, ArrayD<f32>>);

impl StateDict {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, tensor: ArrayD<f32>) -> Option<ArrayD<f32>> {
        self.0.insert(name.into(), tensor)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ArrayD<f32>> {
        self.0.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<ArrayD<f32>> {
        self.0.remove(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Layer identifiers in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Reads a CBOR-encoded state dict.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Decode`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> ModelResult<Self> {
        let file = File::open(path)
            .map_err(|e| ModelError::Decode(format!("{}: {e}", path.display())))?;
        ciborium::from_reader(BufReader::new(file))
            .map_err(|e| ModelError::Decode(format!("{}: {e}", path.display())))
    }

    /// Writes the state dict as CBOR, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Encode`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> ModelResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ModelError::Encode(e.to_string()))?;
        }
        let file = File::create(path).map_err(|e| ModelError::Encode(e.to_string()))?;
        ciborium::into_writer(self, BufWriter::new(file))
            .map_err(|e| ModelError::Encode(e.to_string()))
    }
}

/// Returns the checkpoint filename for a modality, e.g. `SRCNN_ct.cbor`.
#[must_use]
pub fn checkpoint_filename(modality: Modality, backend: InferenceBackend) -> String {
    format!("SRCNN_{}.{}", modality.as_str(), backend.extension())
}

/// Returns the checkpoint path for a modality under `base`.
#[must_use]
pub fn checkpoint_path(base: &Path, modality: Modality, backend: InferenceBackend) -> PathBuf {
    base.join(modality.as_str())
        .join(checkpoint_filename(modality, backend))
}

/// Computes the BLAKE3 hash of a checkpoint file.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn compute_checksum(path: &Path) -> ModelResult<String> {
    let data = std::fs::read(path)
        .map_err(|e| ModelError::LoadFailed(format!("{}: {e}", path.display())))?;
    Ok(blake3::hash(&data).to_hex().to_string())
}

/// Verifies a checkpoint file against an expected BLAKE3 hash.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the hash differs.
pub fn verify_checksum(path: &Path, expected_hash: &str) -> ModelResult<()> {
    let actual = compute_checksum(path)?;
    if actual != expected_hash {
        return Err(ModelError::LoadFailed(format!(
            "checksum mismatch for {}: expected {expected_hash}, got {actual}",
            path.display()
        )));
    }
    Ok(())
}

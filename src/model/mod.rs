// SPDX-License-Identifier: MPL-2.0
//! Super-resolution model architecture, checkpoints and loading.
//!
//! Two backends run the same network:
//!
//! - [`InferenceBackend::Native`]: the [`Srcnn`] implementation in this crate,
//!   built from a CBOR state dict
//! - [`InferenceBackend::Onnx`]: an exported ONNX graph executed by ONNX Runtime
//!
//! Both produce an `Arc<dyn SuperResolver>` that is already in inference mode.

pub mod checkpoint;
pub mod srcnn;

use crate::application::port::ai::{ModelError, ModelResult, SuperResolver};
use crate::infrastructure::onnx::OnnxSrcnn;
use ndarray::Array4;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

pub use checkpoint::{checkpoint_path, compute_checksum, verify_checksum, StateDict};
pub use srcnn::{initial_state_dict, Mode, Srcnn, SRCNN_LAYERS};

/// Runtime used to execute checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceBackend {
    #[default]
    Native,
    Onnx,
}

impl InferenceBackend {
    /// File extension of checkpoints for this backend.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            InferenceBackend::Native => "cbor",
            InferenceBackend::Onnx => "onnx",
        }
    }
}

/// Deserializes a checkpoint and returns an inference-mode model.
///
/// `intra_threads` only applies to the ONNX backend; `0` keeps the runtime
/// default.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not describe a valid
/// SRCNN.
pub fn load_checkpoint(
    path: &Path,
    backend: InferenceBackend,
    intra_threads: usize,
) -> ModelResult<Arc<dyn SuperResolver>> {
    let checksum = compute_checksum(path)?;
    let model: Arc<dyn SuperResolver> = match backend {
        InferenceBackend::Native => {
            let state = StateDict::load(path)?;
            Arc::new(Srcnn::from_state_dict(&state)?.with_checksum(checksum).eval())
        }
        InferenceBackend::Onnx => Arc::new(OnnxSrcnn::load(path, intra_threads)?.with_checksum(checksum)),
    };
    Ok(model)
}

/// Side length of the probe image used by [`validate_model`].
const VALIDATION_SIZE: usize = 32;

/// Validates a model by running a flat-gray test inference.
///
/// # Errors
///
/// Returns an error if inference fails, the output shape differs from the
/// input shape, or the output contains non-finite values.
pub fn validate_model(model: &dyn SuperResolver) -> ModelResult<()> {
    let probe = Array4::<f32>::from_elem((1, 1, VALIDATION_SIZE, VALIDATION_SIZE), 0.5);
    let output = model.enhance(probe.view())?;

    if output.shape() != probe.shape() {
        return Err(ModelError::InferenceFailed(format!(
            "Unexpected output shape: {:?}, expected {:?}",
            output.shape(),
            probe.shape()
        )));
    }
    if output.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::InferenceFailed(
            "Model produced non-finite values".to_string(),
        ));
    }
    Ok(())
}

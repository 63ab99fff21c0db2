// SPDX-License-Identifier: MPL-2.0
//! Super-resolution model port definition.
//!
//! This module defines the [`SuperResolver`] trait implemented by every model
//! backend (the native SRCNN and the ONNX Runtime adapter).
//!
//! # Design Notes
//!
//! - Tensors are NCHW `f32`, batch 1, one channel, intensities in `[0, 1]`
//! - Outputs have the input's spatial shape and an unconstrained range
//! - The trait is `Send + Sync` so one loaded instance can be shared by the
//!   registry across threads

use ndarray::{Array4, ArrayView4};
use std::fmt;
use thiserror::Error;

// =============================================================================
// ModelError
// =============================================================================

/// Errors that can occur while loading or running a model.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// The checkpoint lacks a tensor the architecture needs.
    #[error("Missing tensor '{0}' in checkpoint")]
    MissingTensor(String),

    /// A checkpoint tensor has the wrong shape for its layer.
    #[error("Tensor '{name}' has shape {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        name: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// The checkpoint file could not be decoded.
    #[error("Failed to decode checkpoint: {0}")]
    Decode(String),

    /// The checkpoint could not be written.
    #[error("Failed to encode checkpoint: {0}")]
    Encode(String),

    /// The backend failed to build a runnable model.
    #[error("Failed to load model: {0}")]
    LoadFailed(String),

    /// The input tensor does not satisfy the model's contract.
    #[error("Invalid input tensor: {0}")]
    InvalidInput(String),

    /// Inference failed during processing.
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
}

impl From<ModelError> for crate::error::Error {
    fn from(err: ModelError) -> Self {
        crate::error::Error::Model(err.to_string())
    }
}

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

// =============================================================================
// ModelCapabilities
// =============================================================================

/// Describes a loaded model instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelCapabilities {
    /// Human-readable name of the architecture.
    pub name: &'static str,

    /// Runtime executing the model (`"native"` or `"onnxruntime"`).
    pub backend: &'static str,

    /// Device the weights live on.
    pub device: &'static str,

    /// BLAKE3 digest of the checkpoint the instance was built from.
    pub checksum: Option<String>,
}

impl ModelCapabilities {
    #[must_use]
    pub const fn new(name: &'static str, backend: &'static str) -> Self {
        Self {
            name,
            backend,
            device: "cpu",
            checksum: None,
        }
    }

    #[must_use]
    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }
}

// =============================================================================
// SuperResolver Trait
// =============================================================================

/// Port for shape-preserving super-resolution models.
///
/// Implementations are immutable once loaded: `enhance` takes `&self` and
/// must be deterministic for a given input.
pub trait SuperResolver: Send + Sync + fmt::Debug {
    /// Runs the model on a `[1, 1, H, W]` tensor and returns a tensor of the
    /// same shape.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] if the input shape is invalid or the backend
    /// fails.
    fn enhance(&self, input: ArrayView4<'_, f32>) -> ModelResult<Array4<f32>>;

    /// Returns a description of this instance.
    fn capabilities(&self) -> ModelCapabilities;
}

/// Checks the single-image, single-channel input contract shared by all
/// backends.
///
/// # Errors
///
/// Returns [`ModelError::InvalidInput`] for any other shape.
pub fn check_input_shape(input: &ArrayView4<'_, f32>) -> ModelResult<(usize, usize)> {
    match input.shape() {
        [1, 1, h, w] if *h > 0 && *w > 0 => Ok((*h, *w)),
        other => Err(ModelError::InvalidInput(format!(
            "expected [1, 1, H, W], got {other:?}"
        ))),
    }
}

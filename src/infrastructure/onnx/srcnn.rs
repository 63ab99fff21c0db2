// SPDX-License-Identifier: MPL-2.0
//! ONNX Runtime adapter implementing the [`SuperResolver`] trait.
//!
//! Runs an SRCNN exported to ONNX with input `[1, 1, H, W]` and output of the
//! same shape.
//!
//! [`SuperResolver`]: crate::application::port::SuperResolver

use std::fmt;
use std::path::Path;
use std::sync::Mutex;

use ndarray::{Array4, ArrayView4};
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};

use crate::application::port::ai::{
    check_input_shape, ModelCapabilities, ModelError, ModelResult, SuperResolver,
};
use crate::model::srcnn::SRCNN_NAME;

/// ONNX-based SRCNN instance.
///
/// # Thread Safety
///
/// Running a session needs exclusive access, so concurrent callers sharing one
/// instance are serialized by an internal lock.
pub struct OnnxSrcnn {
    session: Mutex<Session>,
    input_name: String,
    checksum: Option<String>,
}

impl fmt::Debug for OnnxSrcnn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnnxSrcnn")
            .field("input_name", &self.input_name)
            .field("checksum", &self.checksum)
            .finish_non_exhaustive()
    }
}

impl OnnxSrcnn {
    /// Loads an ONNX graph from disk.
    ///
    /// `intra_threads` of `0` keeps the runtime's default thread count.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or the ONNX session fails to
    /// initialize.
    pub fn load(path: &Path, intra_threads: usize) -> ModelResult<Self> {
        if !path.exists() {
            return Err(ModelError::LoadFailed(format!(
                "ONNX graph not found: {}",
                path.display()
            )));
        }

        let mut builder = Session::builder()
            .map_err(|e| ModelError::LoadFailed(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ModelError::LoadFailed(e.to_string()))?;
        if intra_threads > 0 {
            builder = builder
                .with_intra_threads(intra_threads)
                .map_err(|e| ModelError::LoadFailed(e.to_string()))?;
        }
        let session = builder
            .commit_from_file(path)
            .map_err(|e| ModelError::LoadFailed(e.to_string()))?;

        // SRCNN exports typically name the input 'input'
        let input_name = session
            .inputs
            .first()
            .map_or_else(|| "input".to_string(), |i| i.name.clone());

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            checksum: None,
        })
    }

    /// Records the digest of the graph file.
    #[must_use]
    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }
}

impl SuperResolver for OnnxSrcnn {
    fn enhance(&self, input: ArrayView4<'_, f32>) -> ModelResult<Array4<f32>> {
        check_input_shape(&input)?;

        // ONNX Runtime reads contiguous NCHW memory.
        let input_tensor = input.as_standard_layout().into_owned();

        let mut session = self
            .session
            .lock()
            .map_err(|_| ModelError::InferenceFailed("Lock poisoned".to_string()))?;

        let input_ref = ort::value::TensorRef::from_array_view(&input_tensor)
            .map_err(|e| ModelError::InferenceFailed(e.to_string()))?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_ref])
            .map_err(|e| ModelError::InferenceFailed(e.to_string()))?;

        extract_output(&outputs)
    }

    fn capabilities(&self) -> ModelCapabilities {
        let caps = ModelCapabilities::new(SRCNN_NAME, "onnxruntime");
        match &self.checksum {
            Some(sum) => caps.with_checksum(sum.clone()),
            None => caps,
        }
    }
}

/// Copies the first output tensor into an owned `[1, 1, H, W]` array.
fn extract_output(outputs: &SessionOutputs<'_>) -> ModelResult<Array4<f32>> {
    let (_, output) = outputs
        .iter()
        .next()
        .ok_or_else(|| ModelError::InferenceFailed("No output tensor".to_string()))?;

    let (shape, data) = output
        .try_extract_tensor::<f32>()
        .map_err(|e: ort::Error| ModelError::InferenceFailed(e.to_string()))?;

    let dims: Vec<i64> = shape.iter().copied().collect();
    nchw_from_raw(&dims, data)
}

/// Rebuilds an NCHW array from a runtime shape and its flat data.
fn nchw_from_raw(shape: &[i64], data: &[f32]) -> ModelResult<Array4<f32>> {
    let dims = shape
        .iter()
        .map(|&d| usize::try_from(d))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ModelError::InferenceFailed("Negative tensor dimension".to_string()))?;

    let [batch, channels, height, width] = dims[..] else {
        return Err(ModelError::InferenceFailed(format!(
            "Expected 4D tensor, got {}D",
            dims.len()
        )));
    };

    Array4::from_shape_vec((batch, channels, height, width), data.to_vec())
        .map_err(|e| ModelError::InferenceFailed(e.to_string()))
}

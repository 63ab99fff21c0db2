// SPDX-License-Identifier: MPL-2.0
//! Centralized default values for all configuration constants.
//!
//! Relative directory defaults are resolved against the application data
//! directory (see [`crate::app::paths`]).

// ==========================================================================
// Storage Defaults
// ==========================================================================

/// Directory holding one sub-directory of weights per modality.
pub const DEFAULT_CHECKPOINTS_DIR: &str = "checkpoints";

/// Directory receiving stored uploads.
pub const DEFAULT_UPLOADS_DIR: &str = "uploads";

/// Directory receiving enhanced outputs.
pub const DEFAULT_RESULTS_DIR: &str = "results";

// ==========================================================================
// Dataset Defaults
// ==========================================================================

/// Source tree with `Xray/`, `CT/` and `MRI/` folders.
pub const DEFAULT_DATASET_ROOT: &str = "dataset";

/// Directory receiving `train_<modality>.cbor` shards.
pub const DEFAULT_DATASET_OUTPUT_DIR: &str = "preprocessed_data";

/// Seed for the noise augmentation.
pub const DEFAULT_NOISE_SEED: u64 = crate::dataset::DEFAULT_SEED;

// ==========================================================================
// Model Defaults
// ==========================================================================

/// ONNX Runtime intra-op threads; `0` keeps the runtime default.
pub const DEFAULT_ONNX_INTRA_THREADS: usize = 0;

/// Maximum ONNX Runtime intra-op threads accepted from configuration.
pub const MAX_ONNX_INTRA_THREADS: usize = 256;

// ==========================================================================
// Logging Defaults
// ==========================================================================

/// `tracing` filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

// SPDX-License-Identifier: MPL-2.0
//! Application layer - Use cases and orchestration.
//!
//! - [`port`]: Trait definitions (interfaces) for dependency inversion
//! - [`registry`]: Lazy per-modality model cache
//! - [`pipeline`]: Single-image enhancement
//! - [`service`]: Upload and inference boundaries
//!
//! # Dependency Rule
//!
//! - Application layer depends on domain layer (uses domain types)
//! - Infrastructure layer implements application layer ports
//! - Presentation layers (CLI, transports) use application layer services
//!
//! # Example
//!
//! ```no_run
//! use medsr::application::{EnhanceService, EnhancementPipeline, ModelRegistry};
//! use medsr::model::InferenceBackend;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(ModelRegistry::from_checkpoints("checkpoints", InferenceBackend::Native));
//! let service = EnhanceService::new(EnhancementPipeline::new(registry), "uploads", "results");
//!
//! let file = service.store_upload("patient_xray_01.jpg", &std::fs::read("scan.jpg")?)?;
//! let prediction = service.predict(&file)?;
//! println!("{} ({})", prediction.prediction, prediction.enhanced);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod pipeline;
pub mod port;
pub mod registry;
pub mod service;

pub use pipeline::{enhance_canonical, EnhancementPipeline};
pub use registry::{CheckpointLoader, ModelLoader, ModelRegistry};
pub use service::{sanitize_filename, EnhanceService, FileRef, Prediction};

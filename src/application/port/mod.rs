// SPDX-License-Identifier: MPL-2.0
//! Port definitions (traits) for dependency inversion.
//!
//! This module defines abstract interfaces that infrastructure adapters implement.
//!
//! # Available Ports
//!
//! - [`ai`]: Super-resolution models (native and ONNX Runtime)
//!
//! # Design Notes
//!
//! - Traits are `Send + Sync` so one loaded model can serve many threads
//! - Methods return `Result` with layer error types that convert into
//!   [`crate::error::Error`]

pub mod ai;

pub use ai::{ModelCapabilities, ModelError, ModelResult, SuperResolver};

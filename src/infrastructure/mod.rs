// SPDX-License-Identifier: MPL-2.0
//! Infrastructure layer adapters.
//!
//! Concrete implementations of the port traits defined in
//! `application::port` that wrap external runtimes.
//!
//! - [`onnx`]: SRCNN inference via ONNX Runtime (implements [`SuperResolver`])
//!
//! [`SuperResolver`]: crate::application::port::SuperResolver

pub mod onnx;

pub use onnx::OnnxSrcnn;

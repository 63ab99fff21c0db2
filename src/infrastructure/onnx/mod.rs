// SPDX-License-Identifier: MPL-2.0
//! ONNX Runtime adapter implementing the [`SuperResolver`] port trait.
//!
//! - [`OnnxSrcnn`]: SRCNN exported to ONNX, selected with
//!   [`InferenceBackend::Onnx`](crate::model::InferenceBackend::Onnx)
//!
//! [`SuperResolver`]: crate::application::port::SuperResolver

mod srcnn;

pub use srcnn::OnnxSrcnn;

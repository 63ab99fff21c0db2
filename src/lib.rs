// SPDX-License-Identifier: MPL-2.0
//! `medsr` enhances X-ray, CT and MRI images with a small per-modality
//! super-resolution network.
//!
//! Inputs of any size and format (PNG, JPEG, DICOM) are reduced to a
//! 256×256 grayscale canonical form, degraded the way the training data was,
//! and passed through the SRCNN trained for their modality. The crate also
//! builds the per-modality training patch shards offline.

#![doc(html_root_url = "https://docs.rs/medsr/0.3.0")]

pub mod app;
pub mod application;
pub mod config;
pub mod dataset;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod media;
pub mod model;

#[cfg(test)]
pub(crate) mod test_utils;

// SPDX-License-Identifier: MPL-2.0
//! Domain layer - Core types shared by every stage.
//!
//! # Modules
//!
//! - [`modality`]: Imaging modalities and name-based detection
//!   ([`Modality`](modality::Modality), [`detect_modality`](modality::detect_modality))
//! - [`image`]: The fixed-size grayscale image ([`CanonicalImage`](image::CanonicalImage))
//!   and the pipeline's size constants

pub mod image;
pub mod modality;

pub use image::{CanonicalImage, CANONICAL_SIZE, DEGRADED_SIZE, PATCH_SIZE};
pub use modality::{detect_modality, Modality};

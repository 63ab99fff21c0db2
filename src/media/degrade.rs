// SPDX-License-Identifier: MPL-2.0
//! Simulated resolution loss.
//!
//! The models were trained on pairs whose low-resolution side was produced by
//! a bicubic downsample to 128×128 followed by a bicubic upsample back to
//! 256×256. Inference applies the same distortion to a clean canonical image
//! so the network sees inputs from its training distribution. The output size
//! never changes, only detail is lost.

use crate::domain::image::{CanonicalImage, CANONICAL_SIZE, DEGRADED_SIZE};
use image_rs::imageops::{self, FilterType};
use image_rs::GrayImage;

/// Bicubic filter used for both resampling steps.
const BICUBIC: FilterType = FilterType::CatmullRom;

/// Downsamples `image` to 128×128 and upsamples it back to 256×256.
///
/// Accepts any input size (augmented dataset variants are not always
/// canonical); the output is always 256×256.
#[must_use]
pub fn degrade(image: &GrayImage) -> GrayImage {
    let low = imageops::resize(image, DEGRADED_SIZE, DEGRADED_SIZE, BICUBIC);
    imageops::resize(&low, CANONICAL_SIZE, CANONICAL_SIZE, BICUBIC)
}

/// [`degrade`] for canonical images, keeping the canonical type.
#[must_use]
pub fn degrade_canonical(image: &CanonicalImage) -> CanonicalImage {
    CanonicalImage::from_resized(degrade(image.as_gray()))
}

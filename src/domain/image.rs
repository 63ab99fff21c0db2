// SPDX-License-Identifier: MPL-2.0
//! Fixed-size grayscale image types shared by the inference pipeline and the
//! dataset builder.

use crate::error::{Error, Result};
use image_rs::GrayImage;

/// Side length of every canonical image.
pub const CANONICAL_SIZE: u32 = 256;

/// Side length of the simulated low-resolution intermediate.
pub const DEGRADED_SIZE: u32 = 128;

/// Side length of a training patch.
pub const PATCH_SIZE: u32 = 64;

/// A single-channel 8-bit image of exactly
/// [`CANONICAL_SIZE`]×[`CANONICAL_SIZE`] pixels.
///
/// The shape is checked on construction, so any value of this type satisfies
/// the canonical invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalImage(GrayImage);

impl CanonicalImage {
    /// Wraps `image`, failing if it is not 256×256.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidImage`] if the dimensions differ.
    pub fn new(image: GrayImage) -> Result<Self> {
        if image.dimensions() != (CANONICAL_SIZE, CANONICAL_SIZE) {
            return Err(Error::InvalidImage(format!(
                "expected {CANONICAL_SIZE}x{CANONICAL_SIZE} canonical image, got {}x{}",
                image.width(),
                image.height()
            )));
        }
        Ok(Self(image))
    }

    /// Wraps the output of a resize to the canonical size.
    pub(crate) fn from_resized(image: GrayImage) -> Self {
        debug_assert_eq!(image.dimensions(), (CANONICAL_SIZE, CANONICAL_SIZE));
        Self(image)
    }

    /// A canonical image filled with a single intensity.
    #[must_use]
    pub fn filled(value: u8) -> Self {
        Self(GrayImage::from_pixel(
            CANONICAL_SIZE,
            CANONICAL_SIZE,
            image_rs::Luma([value]),
        ))
    }

    #[must_use]
    pub fn as_gray(&self) -> &GrayImage {
        &self.0
    }

    #[must_use]
    pub fn into_gray(self) -> GrayImage {
        self.0
    }
}

impl AsRef<GrayImage> for CanonicalImage {
    fn as_ref(&self) -> &GrayImage {
        &self.0
    }
}

// SPDX-License-Identifier: MPL-2.0
//! Non-overlapping square tiling of HR/LR training pairs.
//!
//! Origins step by the patch size from `(0, 0)` in row-major order (rows
//! outer). A trailing strip narrower than one patch is discarded.

use image_rs::{imageops, GrayImage};

/// Top-left corners of every full patch in a `width`×`height` image.
#[must_use]
pub fn patch_origins(width: u32, height: u32, patch_size: u32) -> Vec<(u32, u32)> {
    if patch_size == 0 {
        return Vec::new();
    }
    let columns = width / patch_size;
    let rows = height / patch_size;
    (0..rows)
        .flat_map(|row| (0..columns).map(move |col| (col * patch_size, row * patch_size)))
        .collect()
}

/// Cuts `image` into full `patch_size`×`patch_size` patches.
#[must_use]
pub fn tile(image: &GrayImage, patch_size: u32) -> Vec<GrayImage> {
    patch_origins(image.width(), image.height(), patch_size)
        .into_iter()
        .map(|(x, y)| imageops::crop_imm(image, x, y, patch_size, patch_size).to_image())
        .collect()
}

/// Cuts an HR/LR pair at the same origins.
///
/// Origins are computed over the smaller of the two images in each
/// dimension, so every returned pair is aligned and full-sized.
#[must_use]
pub fn tile_pairs(
    hr: &GrayImage,
    lr: &GrayImage,
    patch_size: u32,
) -> Vec<(GrayImage, GrayImage)> {
    let width = hr.width().min(lr.width());
    let height = hr.height().min(lr.height());
    patch_origins(width, height, patch_size)
        .into_iter()
        .map(|(x, y)| {
            (
                imageops::crop_imm(hr, x, y, patch_size, patch_size).to_image(),
                imageops::crop_imm(lr, x, y, patch_size, patch_size).to_image(),
            )
        })
        .collect()
}

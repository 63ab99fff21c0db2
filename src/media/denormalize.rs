// SPDX-License-Identifier: MPL-2.0
//! Conversion between 8-bit grayscale images and model tensors.
//!
//! Model inputs are NCHW `[1, 1, H, W]` tensors scaled to `[0, 1]`. Model
//! outputs have an unconstrained range and are scaled back by 255, clipped
//! and rounded before display.

use crate::application::port::ai::check_input_shape;
use crate::error::{Error, Result};
use image_rs::GrayImage;
use ndarray::{Array4, ArrayView4};

/// Converts an 8-bit image to a `[1, 1, H, W]` tensor in `[0, 1]`.
#[must_use]
pub fn to_input_tensor(image: &GrayImage) -> Array4<f32> {
    let (width, height) = image.dimensions();
    let mut tensor = Array4::<f32>::zeros((1, 1, height as usize, width as usize));
    for (x, y, pixel) in image.enumerate_pixels() {
        tensor[[0, 0, y as usize, x as usize]] = f32::from(pixel.0[0]) / 255.0;
    }
    tensor
}

/// Converts a `[1, 1, H, W]` model output to an 8-bit `H`×`W` image.
///
/// # Errors
///
/// Returns [`Error::Model`] if the tensor is not single-image single-channel.
pub fn denormalize(output: ArrayView4<'_, f32>) -> Result<GrayImage> {
    let (height, width) = check_input_shape(&output)?;

    // Clamp ensures value is in 0-255 range before the cast
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let pixels: Vec<u8> = output
        .iter()
        .map(|v| (v * 255.0).clamp(0.0, 255.0).round() as u8)
        .collect();

    let width = u32::try_from(width).map_err(|_| Error::Model("Image width too large".to_string()))?;
    let height =
        u32::try_from(height).map_err(|_| Error::Model("Image height too large".to_string()))?;

    GrayImage::from_raw(width, height, pixels)
        .ok_or_else(|| Error::Model("Failed to create image".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{assert_abs_diff_eq, F32_EPSILON};
    use image_rs::Luma;

    #[test]
    fn input_tensor_has_nchw_shape() {
        let image = GrayImage::new(100, 80);
        let tensor = to_input_tensor(&image);
        assert_eq!(tensor.shape(), &[1, 1, 80, 100]);
    }

    #[test]
    fn input_tensor_is_scaled_to_unit_range() {
        let mut image = GrayImage::new(2, 1);
        image.put_pixel(0, 0, Luma([255]));
        image.put_pixel(1, 0, Luma([51]));
        let tensor = to_input_tensor(&image);
        assert_abs_diff_eq!(tensor[[0, 0, 0, 0]], 1.0, epsilon = F32_EPSILON);
        assert_abs_diff_eq!(tensor[[0, 0, 0, 1]], 0.2, epsilon = F32_EPSILON);
    }

    #[test]
    fn output_is_scaled_clipped_and_rounded() {
        let output = Array4::from_shape_vec((1, 1, 1, 5), vec![-0.3, 0.0, 0.5, 1.0, 1.7]).unwrap();
        let image = denormalize(output.view()).unwrap();
        // 0.5 * 255 = 127.5 rounds half away from zero
        assert_eq!(image.into_raw(), vec![0, 0, 128, 255, 255]);
    }

    #[test]
    fn output_keeps_row_major_layout() {
        let output = Array4::from_shape_fn((1, 1, 2, 3), |(_, _, y, x)| {
            if y == 1 && x == 2 {
                1.0
            } else {
                0.0
            }
        });
        let image = denormalize(output.view()).unwrap();
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.get_pixel(2, 1).0[0], 255);
        assert_eq!(image.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn tensor_round_trip_is_lossless() {
        let image = GrayImage::from_fn(16, 9, |x, y| Luma([u8::try_from((x * 16 + y) % 256).unwrap_or(0)]));
        let back = denormalize(to_input_tensor(&image).view()).unwrap();
        assert_eq!(back, image);
    }

    #[test]
    fn rejects_multi_channel_output() {
        let output = Array4::<f32>::zeros((1, 3, 4, 4));
        assert!(matches!(denormalize(output.view()), Err(Error::Model(_))));
    }
}

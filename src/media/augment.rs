// SPDX-License-Identifier: MPL-2.0
//! Per-modality training augmentations.
//!
//! Each modality has a fixed, enumerated list of variants rather than a
//! random policy, and the lists deliberately differ between modalities: the
//! trained models expect exactly these input distributions.
//!
//! | Modality | Variants |
//! |----------|----------|
//! | X-ray    | identity, vertical flip, horizontal flip, 90° clockwise |
//! | MRI      | identity, Gaussian noise (σ = 5), 3×3 Gaussian blur, contrast ×1.2 |
//! | CT       | identity, shrink by 5 px, 180° rotation |
//!
//! The CT shrink variant is 251×251 and so no longer aligned with the other
//! variants' 64-pixel grid; its last patch row and column are dropped by the
//! tiler.

use crate::domain::modality::Modality;
use image_rs::imageops::{self, FilterType};
use image_rs::{GrayImage, Luma};
use rand::Rng;
use rand_distr::StandardNormal;

/// Binomial taps of the 3×3 Gaussian kernel used when no sigma is given.
const BLUR_3X3_TAPS: [f32; 3] = [0.25, 0.5, 0.25];

/// One augmentation variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Augmentation {
    Identity,
    /// Mirror top to bottom.
    FlipVertical,
    /// Mirror left to right.
    FlipHorizontal,
    /// Rotate 90° clockwise.
    Rotate90,
    Rotate180,
    /// Add zero-mean Gaussian noise, saturating at 0 and 255.
    GaussianNoise { std_dev: f32 },
    /// 3×3 Gaussian blur with reflected borders.
    GaussianBlur3x3,
    /// Multiply intensities, saturating at 255.
    Contrast { alpha: f32 },
    /// Resize to `width - pixels` × `height - pixels`.
    Shrink { pixels: u32 },
}

pub const XRAY_AUGMENTATIONS: [Augmentation; 4] = [
    Augmentation::Identity,
    Augmentation::FlipVertical,
    Augmentation::FlipHorizontal,
    Augmentation::Rotate90,
];

pub const MRI_AUGMENTATIONS: [Augmentation; 4] = [
    Augmentation::Identity,
    Augmentation::GaussianNoise { std_dev: 5.0 },
    Augmentation::GaussianBlur3x3,
    Augmentation::Contrast { alpha: 1.2 },
];

pub const CT_AUGMENTATIONS: [Augmentation; 3] = [
    Augmentation::Identity,
    Augmentation::Shrink { pixels: 5 },
    Augmentation::Rotate180,
];

/// Returns the augmentation list for a modality.
#[must_use]
pub fn augmentations_for(modality: Modality) -> &'static [Augmentation] {
    match modality {
        Modality::Xray => &XRAY_AUGMENTATIONS,
        Modality::Mri => &MRI_AUGMENTATIONS,
        Modality::Ct => &CT_AUGMENTATIONS,
    }
}

/// Applies every augmentation of `modality` to `image`, in list order.
///
/// `rng` only feeds the noise variant.
pub fn augment<R: Rng + ?Sized>(image: &GrayImage, modality: Modality, rng: &mut R) -> Vec<GrayImage> {
    augmentations_for(modality)
        .iter()
        .map(|augmentation| augmentation.apply(image, rng))
        .collect()
}

impl Augmentation {
    /// Produces the augmented variant of `image`.
    pub fn apply<R: Rng + ?Sized>(&self, image: &GrayImage, rng: &mut R) -> GrayImage {
        match *self {
            Augmentation::Identity => image.clone(),
            Augmentation::FlipVertical => imageops::flip_vertical(image),
            Augmentation::FlipHorizontal => imageops::flip_horizontal(image),
            Augmentation::Rotate90 => imageops::rotate90(image),
            Augmentation::Rotate180 => imageops::rotate180(image),
            Augmentation::GaussianNoise { std_dev } => add_noise(image, std_dev, rng),
            Augmentation::GaussianBlur3x3 => gaussian_blur_3x3(image),
            Augmentation::Contrast { alpha } => scale_contrast(image, alpha),
            Augmentation::Shrink { pixels } => {
                let width = image.width().saturating_sub(pixels).max(1);
                let height = image.height().saturating_sub(pixels).max(1);
                imageops::resize(image, width, height, FilterType::Triangle)
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn saturate(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn add_noise<R: Rng + ?Sized>(image: &GrayImage, std_dev: f32, rng: &mut R) -> GrayImage {
    let mut noisy = image.clone();
    for pixel in noisy.pixels_mut() {
        let noise: f32 = rng.sample(StandardNormal);
        pixel.0[0] = saturate(f32::from(pixel.0[0]) + noise * std_dev);
    }
    noisy
}

fn scale_contrast(image: &GrayImage, alpha: f32) -> GrayImage {
    let mut scaled = image.clone();
    for pixel in scaled.pixels_mut() {
        pixel.0[0] = saturate((f32::from(pixel.0[0]) * alpha).abs());
    }
    scaled
}

/// Index into `0..len` with mirrored borders that do not repeat the edge
/// pixel (`-1 → 1`, `len → len - 2`).
fn reflect_101(index: i64, len: u32) -> u32 {
    let len = i64::from(len);
    if len == 1 {
        return 0;
    }
    let reflected = if index < 0 {
        -index
    } else if index >= len {
        2 * (len - 1) - index
    } else {
        index
    };
    // len > 1 and |index| <= len keep this within 0..len
    u32::try_from(reflected.clamp(0, len - 1)).unwrap_or(0)
}

fn gaussian_blur_3x3(image: &GrayImage) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }

    let kernel = BLUR_3X3_TAPS;

    // Separable: horizontal pass into f32, then vertical pass back to u8.
    let mut horizontal = vec![0.0_f32; (width * height) as usize];
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = reflect_101(i64::from(x) + k as i64 - 1, width);
                acc += weight * f32::from(image.get_pixel(sx, y).0[0]);
            }
            horizontal[(y * width + x) as usize] = acc;
        }
    }

    GrayImage::from_fn(width, height, |x, y| {
        let mut acc = 0.0;
        for (k, weight) in kernel.iter().enumerate() {
            let sy = reflect_101(i64::from(y) + k as i64 - 1, height);
            acc += weight * horizontal[(sy * width + x) as usize];
        }
        Luma([saturate(acc)])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn gradient(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            Luma([u8::try_from((x * 7 + y * 3) % 200).unwrap_or(0)])
        })
    }

    #[test]
    fn variant_counts_per_modality() {
        assert_eq!(augmentations_for(Modality::Xray).len(), 4);
        assert_eq!(augmentations_for(Modality::Mri).len(), 4);
        assert_eq!(augmentations_for(Modality::Ct).len(), 3);
        for modality in Modality::ALL {
            assert_eq!(augmentations_for(modality)[0], Augmentation::Identity);
        }
    }

    #[test]
    fn xray_variants_are_flips_and_rotation() {
        let image = gradient(256, 256);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let variants = augment(&image, Modality::Xray, &mut rng);

        assert_eq!(variants[0], image);
        assert_eq!(variants[1].get_pixel(10, 0), image.get_pixel(10, 255));
        assert_eq!(variants[2].get_pixel(0, 10), image.get_pixel(255, 10));
        // Clockwise: the top-left source pixel ends up top-right.
        assert_eq!(variants[3].get_pixel(255, 0), image.get_pixel(0, 0));
    }

    #[test]
    fn ct_shrink_changes_sampling_grid() {
        let image = gradient(256, 256);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let variants = augment(&image, Modality::Ct, &mut rng);

        assert_eq!(variants[1].dimensions(), (251, 251));
        assert_eq!(variants[2].get_pixel(0, 0), image.get_pixel(255, 255));
    }

    #[test]
    fn mri_variants_keep_shape() {
        let image = gradient(256, 256);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let variants = augment(&image, Modality::Mri, &mut rng);

        assert_eq!(variants.len(), 4);
        for variant in &variants {
            assert_eq!(variant.dimensions(), (256, 256));
        }
        assert_ne!(variants[1], image);
    }

    #[test]
    fn noise_is_reproducible_for_a_seed() {
        let image = GrayImage::from_pixel(32, 32, Luma([128]));
        let noise = Augmentation::GaussianNoise { std_dev: 5.0 };
        let a = noise.apply(&image, &mut ChaCha8Rng::seed_from_u64(7));
        let b = noise.apply(&image, &mut ChaCha8Rng::seed_from_u64(7));
        assert_eq!(a, b);

        // Zero-mean: the average stays close to the original level.
        let mean: f64 =
            a.pixels().map(|p| f64::from(p.0[0])).sum::<f64>() / f64::from(32 * 32);
        assert!((mean - 128.0).abs() < 1.0);
    }

    #[test]
    fn noise_saturates_instead_of_wrapping() {
        let black = GrayImage::from_pixel(16, 16, Luma([0]));
        let noisy = Augmentation::GaussianNoise { std_dev: 5.0 }
            .apply(&black, &mut ChaCha8Rng::seed_from_u64(1));
        assert!(noisy.pixels().all(|p| p.0[0] < 40));
    }

    #[test]
    fn blur_uses_binomial_taps() {
        let flat = GrayImage::from_pixel(8, 8, Luma([90]));
        assert_eq!(gaussian_blur_3x3(&flat), flat);

        let mut spike = GrayImage::new(5, 5);
        spike.put_pixel(2, 2, Luma([255]));
        let blurred = gaussian_blur_3x3(&spike);
        let center = blurred.get_pixel(2, 2).0[0];
        let neighbor = blurred.get_pixel(1, 2).0[0];
        let diagonal = blurred.get_pixel(1, 1).0[0];
        // 255 × {1/4, 1/8, 1/16}, rounded
        assert_eq!((center, neighbor, diagonal), (64, 32, 16));
        assert_eq!(blurred.get_pixel(0, 2).0[0], 0);
    }

    #[test]
    fn contrast_scales_and_saturates() {
        let mut image = GrayImage::new(2, 1);
        image.put_pixel(0, 0, Luma([100]));
        image.put_pixel(1, 0, Luma([250]));
        let scaled = Augmentation::Contrast { alpha: 1.2 }
            .apply(&image, &mut ChaCha8Rng::seed_from_u64(0));
        assert_eq!(scaled.into_raw(), vec![120, 255]);
    }

    #[test]
    fn reflect_101_mirrors_without_repeating_edge() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(2, 5), 2);
        assert_eq!(reflect_101(-1, 1), 0);
    }
}

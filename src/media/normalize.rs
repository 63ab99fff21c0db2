// SPDX-License-Identifier: MPL-2.0
//! Decoding of heterogeneous inputs into [`CanonicalImage`]s.
//!
//! Raster formats (PNG, JPEG, ...) are decoded by the `image` crate and
//! converted to luminance. DICOM files (`.dcm`) are decoded with the `dicom`
//! crate; their raw pixel values are not byte-ranged, so each image is
//! min-max stretched into `[0, 255]` before quantizing.
//!
//! Either way the result is resampled to 256×256.

use crate::domain::image::{CanonicalImage, CANONICAL_SIZE};
use crate::error::{Error, Result};
use dicom::pixeldata::PixelDecoder;
use image_rs::imageops::{self, FilterType};
use image_rs::{DynamicImage, GrayImage, ImageReader};
use std::path::Path;
use tracing::debug;

/// Extension marking the medical-archive format.
pub const DICOM_EXTENSION: &str = "dcm";

/// Decodes the file at `path`, choosing the decoder from its extension.
///
/// # Errors
///
/// Returns [`Error::InvalidImage`] if the content cannot be decoded or holds
/// no pixels, and [`Error::Io`] if the file cannot be read.
pub fn canonicalize<P: AsRef<Path>>(path: P) -> Result<CanonicalImage> {
    let path = path.as_ref();
    let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");
    canonicalize_with_extension(path, extension)
}

/// Decodes the file at `path` as the format named by `extension`.
///
/// # Errors
///
/// See [`canonicalize`].
pub fn canonicalize_with_extension(path: &Path, extension: &str) -> Result<CanonicalImage> {
    let gray = if extension
        .trim_start_matches('.')
        .eq_ignore_ascii_case(DICOM_EXTENSION)
    {
        decode_dicom(path)?
    } else {
        decode_raster(path)?
    };
    debug!(
        path = %path.display(),
        width = gray.width(),
        height = gray.height(),
        "decoded source image"
    );
    canonicalize_gray(&gray)
}

/// Canonicalizes an in-memory image.
///
/// # Errors
///
/// Returns [`Error::InvalidImage`] if the image has no pixels.
pub fn canonicalize_dynamic(image: &DynamicImage) -> Result<CanonicalImage> {
    canonicalize_gray(&image.to_luma8())
}

/// Resamples a grayscale image to the canonical size.
///
/// # Errors
///
/// Returns [`Error::InvalidImage`] if the image has no pixels.
pub fn canonicalize_gray(image: &GrayImage) -> Result<CanonicalImage> {
    if image.width() == 0 || image.height() == 0 {
        return Err(Error::InvalidImage("image has no pixels".to_string()));
    }
    if image.dimensions() == (CANONICAL_SIZE, CANONICAL_SIZE) {
        return CanonicalImage::new(image.clone());
    }
    CanonicalImage::new(imageops::resize(
        image,
        CANONICAL_SIZE,
        CANONICAL_SIZE,
        FilterType::Triangle,
    ))
}

/// Decodes a standard raster file to a single luminance channel.
///
/// The format is guessed from the content, so a mislabeled extension still
/// decodes.
///
/// # Errors
///
/// Returns [`Error::InvalidImage`] if decoding fails.
pub fn decode_raster(path: &Path) -> Result<GrayImage> {
    let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    Ok(image.to_luma8())
}

/// Decodes the first frame of a DICOM file and stretches it to 8 bits.
///
/// Multi-sample pixels (e.g. RGB) are averaged into one intensity.
///
/// # Errors
///
/// Returns [`Error::InvalidImage`] if the file is not valid DICOM or its
/// pixel data cannot be decoded.
pub fn decode_dicom(path: &Path) -> Result<GrayImage> {
    let object = dicom::object::open_file(path)
        .map_err(|e| Error::InvalidImage(format!("DICOM parse error: {e}")))?;
    let pixels = object
        .decode_pixel_data()
        .map_err(|e| Error::InvalidImage(format!("DICOM pixel data error: {e}")))?;

    let width = pixels.columns();
    let height = pixels.rows();
    let samples = usize::from(pixels.samples_per_pixel().max(1));
    let values = pixels
        .to_vec_frame::<f32>(0)
        .map_err(|e| Error::InvalidImage(format!("DICOM pixel conversion error: {e}")))?;

    let expected = width as usize * height as usize * samples;
    if values.len() != expected {
        return Err(Error::InvalidImage(format!(
            "DICOM frame size mismatch: expected {expected} values, got {}",
            values.len()
        )));
    }

    #[allow(clippy::cast_precision_loss)]
    let intensities: Vec<f32> = if samples == 1 {
        values
    } else {
        values
            .chunks_exact(samples)
            .map(|px| px.iter().sum::<f32>() / samples as f32)
            .collect()
    };

    stretch_to_u8(width, height, &intensities)
}

/// Maps raw intensities onto `[0, 255]`: subtract the minimum, divide by the
/// resulting maximum when it is positive, scale by 255 and truncate.
///
/// A constant input maps to all zeros.
///
/// # Errors
///
/// Returns [`Error::InvalidImage`] if `values` is empty or does not match the
/// dimensions.
pub fn stretch_to_u8(width: u32, height: u32, values: &[f32]) -> Result<GrayImage> {
    if values.is_empty() || values.len() != width as usize * height as usize {
        return Err(Error::InvalidImage(format!(
            "expected {width}x{height} intensities, got {}",
            values.len()
        )));
    }

    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().map(|v| v - min).fold(0.0_f32, f32::max);
    let divisor = if max > 0.0 { max } else { 1.0 };

    // Clamp guarantees 0.0..=255.0, truncation matches the 8-bit cast
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let bytes = values
        .iter()
        .map(|v| ((v - min) / divisor * 255.0).clamp(0.0, 255.0) as u8)
        .collect();

    GrayImage::from_raw(width, height, bytes)
        .ok_or_else(|| Error::InvalidImage("failed to build grayscale image".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image_rs::{Luma, Rgb, RgbImage};
    use tempfile::tempdir;

    #[test]
    fn png_of_any_size_becomes_canonical() {
        let dir = tempdir().expect("failed to create temp dir");
        let path = dir.path().join("scan.png");
        RgbImage::from_pixel(300, 120, Rgb([10, 200, 30]))
            .save(&path)
            .expect("failed to write png");

        let canonical = canonicalize(&path).expect("png should decode");
        assert_eq!(canonical.as_gray().dimensions(), (256, 256));
    }

    #[test]
    fn jpeg_becomes_canonical() {
        let dir = tempdir().expect("failed to create temp dir");
        let path = dir.path().join("scan.jpg");
        GrayImage::from_pixel(64, 64, Luma([99]))
            .save(&path)
            .expect("failed to write jpeg");

        let canonical = canonicalize(&path).expect("jpeg should decode");
        assert_eq!(canonical.as_gray().dimensions(), (256, 256));
    }

    #[test]
    fn corrupt_file_is_invalid_image() {
        let dir = tempdir().expect("failed to create temp dir");
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"this is not a png").expect("failed to write file");

        assert!(matches!(canonicalize(&path), Err(Error::InvalidImage(_))));
    }

    #[test]
    fn corrupt_dicom_is_invalid_image() {
        let dir = tempdir().expect("failed to create temp dir");
        let path = dir.path().join("broken.dcm");
        std::fs::write(&path, b"DICM? no").expect("failed to write file");

        assert!(matches!(canonicalize(&path), Err(Error::InvalidImage(_))));
    }

    /// Writes a MONOCHROME2 16-bit file whose columns ramp 1000, 1050, ...
    fn write_ramp_dicom(path: &Path, width: u16, height: u16) {
        use dicom::core::{DataElement, PrimitiveValue, VR};
        use dicom::dictionary_std::{tags, uids};
        use dicom::object::{FileMetaTableBuilder, InMemDicomObject};

        let values: Vec<u16> = (0..height)
            .flat_map(|_| (0..width).map(|x| 1000 + 50 * x))
            .collect();

        let mut object = InMemDicomObject::new_empty();
        object.put(DataElement::new(
            tags::SOP_CLASS_UID,
            VR::UI,
            PrimitiveValue::from(uids::SECONDARY_CAPTURE_IMAGE_STORAGE),
        ));
        object.put(DataElement::new(tags::SOP_INSTANCE_UID, VR::UI, PrimitiveValue::from("2.25.1")));
        object.put(DataElement::new(tags::SAMPLES_PER_PIXEL, VR::US, PrimitiveValue::from(1_u16)));
        object.put(DataElement::new(
            tags::PHOTOMETRIC_INTERPRETATION,
            VR::CS,
            PrimitiveValue::from("MONOCHROME2"),
        ));
        object.put(DataElement::new(tags::ROWS, VR::US, PrimitiveValue::from(height)));
        object.put(DataElement::new(tags::COLUMNS, VR::US, PrimitiveValue::from(width)));
        object.put(DataElement::new(tags::BITS_ALLOCATED, VR::US, PrimitiveValue::from(16_u16)));
        object.put(DataElement::new(tags::BITS_STORED, VR::US, PrimitiveValue::from(16_u16)));
        object.put(DataElement::new(tags::HIGH_BIT, VR::US, PrimitiveValue::from(15_u16)));
        object.put(DataElement::new(tags::PIXEL_REPRESENTATION, VR::US, PrimitiveValue::from(0_u16)));
        object.put(DataElement::new(tags::PIXEL_DATA, VR::OW, PrimitiveValue::U16(values.into())));

        object
            .with_meta(
                FileMetaTableBuilder::new()
                    .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
                    .media_storage_sop_class_uid(uids::SECONDARY_CAPTURE_IMAGE_STORAGE)
                    .media_storage_sop_instance_uid("2.25.1"),
            )
            .expect("failed to build file meta")
            .write_to_file(path)
            .expect("failed to write dicom");
    }

    #[test]
    fn dicom_is_stretched_and_truncated_to_bytes() {
        let dir = tempdir().expect("failed to create temp dir");
        let path = dir.path().join("head_ct.dcm");
        write_ramp_dicom(&path, 40, 30);

        let gray = decode_dicom(&path).expect("dicom should decode");
        assert_eq!(gray.dimensions(), (40, 30));
        assert_eq!(gray.pixels().map(|p| p.0[0]).min(), Some(0));
        assert_eq!(gray.pixels().map(|p| p.0[0]).max(), Some(255));
        // (50 * x) / 1950 * 255, truncated: 6.54, 13.08, 19.62, 26.15
        let first_row: Vec<u8> = (0..5).map(|x| gray.get_pixel(x, 0).0[0]).collect();
        assert_eq!(first_row, vec![0, 6, 13, 19, 26]);
        assert_eq!(gray.get_pixel(39, 29).0[0], 255);
    }

    #[test]
    fn dicom_becomes_canonical() {
        let dir = tempdir().expect("failed to create temp dir");
        let path = dir.path().join("knee_mri.dcm");
        write_ramp_dicom(&path, 40, 30);

        let canonical = canonicalize(&path).expect("dicom should canonicalize");
        assert_eq!(canonical.as_gray().dimensions(), (256, 256));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempdir().expect("failed to create temp dir");
        let err = canonicalize(dir.path().join("absent.png")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn empty_image_is_rejected() {
        let empty = GrayImage::new(0, 0);
        assert!(matches!(
            canonicalize_gray(&empty),
            Err(Error::InvalidImage(_))
        ));
    }

    #[test]
    fn canonical_input_is_kept_as_is() {
        let mut image = GrayImage::new(256, 256);
        image.put_pixel(3, 4, Luma([200]));
        let canonical = canonicalize_gray(&image).unwrap();
        assert_eq!(canonical.as_gray(), &image);
    }

    #[test]
    fn dynamic_rgb_image_is_reduced_to_one_channel() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, Rgb([255, 255, 255])));
        let canonical = canonicalize_dynamic(&image).unwrap();
        assert!(canonical.as_gray().pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn stretch_spans_full_byte_range() {
        let values = [-1000.0, 0.0, 1000.0, 3000.0];
        let image = stretch_to_u8(2, 2, &values).unwrap();
        let raw = image.into_raw();
        assert_eq!(raw[0], 0);
        assert_eq!(raw[1], 63); // 1000 / 4000 * 255 = 63.75, truncated
        assert_eq!(raw[2], 127);
        assert_eq!(raw[3], 255);
    }

    #[test]
    fn stretch_of_constant_values_is_black() {
        let image = stretch_to_u8(2, 1, &[512.0, 512.0]).unwrap();
        assert_eq!(image.into_raw(), vec![0, 0]);
    }

    #[test]
    fn stretch_rejects_size_mismatch() {
        assert!(stretch_to_u8(2, 2, &[1.0, 2.0]).is_err());
        assert!(stretch_to_u8(0, 0, &[]).is_err());
    }
}

/// Image loading for display
///
/// Decodes standard raster files with the `image` crate and DICOM files with
/// dicom-rs. DICOM intensities are stretched to the full 8-bit range per image.
/// The result is an RGBA buffer bounded to a square box, ready for the UI.

use dicom_pixeldata::PixelDecoder;
use image::{imageops::FilterType, DynamicImage, GrayImage, ImageReader, RgbImage};
use std::path::Path;

use crate::error::{LabelerError, Result};

/// File extensions handled by the DICOM decoder
const DICOM_EXTENSIONS: [&str; 2] = ["dcm", "dicom"];

/// A decoded, display-sized bitmap
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayImage {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA8 pixels
    pub rgba: Vec<u8>,
}

/// Load an image and shrink it to fit in `max_side × max_side`.
///
/// Smaller images are left at their native size. Any decode problem is
/// returned as [`LabelerError::Decode`]; this function never panics on bad input.
pub fn load_for_display(path: &Path, max_side: u32) -> Result<DisplayImage> {
    let image = if is_dicom(path) {
        decode_dicom(path)?
    } else {
        decode_raster(path)?
    };

    let image = fit_within(image, max_side.max(1));
    let rgba = image.to_rgba8();

    Ok(DisplayImage {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}

/// Check whether the file should go through the DICOM decoder
pub fn is_dicom(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| DICOM_EXTENSIONS.contains(&ext.as_str()))
}

fn decode_raster(path: &Path) -> Result<DynamicImage> {
    ImageReader::open(path)
        .map_err(|e| LabelerError::io(path, e))?
        .with_guessed_format()
        .map_err(|e| LabelerError::io(path, e))?
        .decode()
        .map_err(|e| LabelerError::decode(path, e.to_string()))
}

/// Decode the first frame of a DICOM file into an 8-bit image
fn decode_dicom(path: &Path) -> Result<DynamicImage> {
    let object =
        dicom_object::open_file(path).map_err(|e| LabelerError::decode(path, e.to_string()))?;
    let pixels = object
        .decode_pixel_data()
        .map_err(|e| LabelerError::decode(path, e.to_string()))?;

    let width = pixels.columns();
    let height = pixels.rows();
    let samples = usize::from(pixels.samples_per_pixel());

    let values: Vec<f32> = pixels
        .to_vec()
        .map_err(|e| LabelerError::decode(path, e.to_string()))?;

    let frame_len = width as usize * height as usize * samples;
    if frame_len == 0 || values.len() < frame_len {
        return Err(LabelerError::decode(
            path,
            format!(
                "pixel data holds {} values, expected at least {} ({}x{}x{})",
                values.len(),
                frame_len,
                width,
                height,
                samples
            ),
        ));
    }

    let bytes = normalize_to_u8(&values[..frame_len]);

    let image = match samples {
        1 => GrayImage::from_raw(width, height, bytes).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(width, height, bytes).map(DynamicImage::ImageRgb8),
        other => {
            return Err(LabelerError::decode(
                path,
                format!("unsupported samples per pixel: {other}"),
            ))
        }
    };

    image.ok_or_else(|| LabelerError::decode(path, "pixel buffer does not match dimensions"))
}

/// Stretch intensities to 0..=255: subtract the minimum, divide by the
/// resulting maximum, scale to 255 (truncating).
///
/// A flat image (no contrast) maps to all zeros; non-finite samples become 0.
pub fn normalize_to_u8(values: &[f32]) -> Vec<u8> {
    let (min, max) = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

    let range = max - min;
    if !range.is_finite() || range <= 0.0 {
        return vec![0; values.len()];
    }

    values
        .iter()
        .map(|&v| {
            if v.is_finite() {
                ((v - min) / range * 255.0) as u8
            } else {
                0
            }
        })
        .collect()
}

/// Downscale (never upscale) so that both sides are at most `max_side`
fn fit_within(image: DynamicImage, max_side: u32) -> DynamicImage {
    if image.width() <= max_side && image.height() <= max_side {
        return image;
    }
    image.resize(max_side, max_side, FilterType::Lanczos3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicom_core::{DataElement, PrimitiveValue, VR};
    use dicom_dictionary_std::{tags, uids};
    use dicom_object::{FileMetaTableBuilder, InMemDicomObject};
    use image::{Rgb, RgbImage};
    use std::fs;
    use tempfile::TempDir;

    /// Single-frame 4x2 MONOCHROME2 file, 16-bit unsigned, values 100..=800
    fn write_mono_dicom(path: &Path) {
        let mut object = InMemDicomObject::new_empty();
        object.put(DataElement::new(
            tags::SOP_CLASS_UID,
            VR::UI,
            PrimitiveValue::from(uids::SECONDARY_CAPTURE_IMAGE_STORAGE),
        ));
        object.put(DataElement::new(
            tags::SOP_INSTANCE_UID,
            VR::UI,
            PrimitiveValue::from("2.25.1234567890"),
        ));
        object.put(DataElement::new(
            tags::SAMPLES_PER_PIXEL,
            VR::US,
            PrimitiveValue::from(1_u16),
        ));
        object.put(DataElement::new(
            tags::PHOTOMETRIC_INTERPRETATION,
            VR::CS,
            PrimitiveValue::from("MONOCHROME2"),
        ));
        object.put(DataElement::new(tags::ROWS, VR::US, PrimitiveValue::from(2_u16)));
        object.put(DataElement::new(tags::COLUMNS, VR::US, PrimitiveValue::from(4_u16)));
        object.put(DataElement::new(tags::BITS_ALLOCATED, VR::US, PrimitiveValue::from(16_u16)));
        object.put(DataElement::new(tags::BITS_STORED, VR::US, PrimitiveValue::from(16_u16)));
        object.put(DataElement::new(tags::HIGH_BIT, VR::US, PrimitiveValue::from(15_u16)));
        object.put(DataElement::new(
            tags::PIXEL_REPRESENTATION,
            VR::US,
            PrimitiveValue::from(0_u16),
        ));
        object.put(DataElement::new(
            tags::PIXEL_DATA,
            VR::OW,
            PrimitiveValue::from([100_u16, 200, 300, 400, 500, 600, 700, 800]),
        ));

        let file = object
            .with_meta(
                FileMetaTableBuilder::new().transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN),
            )
            .unwrap();
        file.write_to_file(path).unwrap();
    }

    #[test]
    fn test_normalize_stretches_to_full_range() {
        let bytes = normalize_to_u8(&[100.0, 150.0, 200.0]);
        assert_eq!(bytes, vec![0, 127, 255]);
    }

    #[test]
    fn test_normalize_flat_image_is_black() {
        assert_eq!(normalize_to_u8(&[42.0; 4]), vec![0; 4]);
        assert!(normalize_to_u8(&[]).is_empty());
    }

    #[test]
    fn test_normalize_ignores_non_finite_samples() {
        let bytes = normalize_to_u8(&[0.0, f32::NAN, 10.0]);
        assert_eq!(bytes, vec![0, 0, 255]);
    }

    #[test]
    fn test_large_raster_is_bounded_with_aspect_ratio() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wide.png");
        RgbImage::from_pixel(800, 400, Rgb([10, 20, 30])).save(&path).unwrap();

        let display = load_for_display(&path, 500).unwrap();
        assert_eq!((display.width, display.height), (500, 250));
        assert_eq!(display.rgba.len(), 500 * 250 * 4);
    }

    #[test]
    fn test_small_raster_is_not_upscaled() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("small.jpg");
        RgbImage::from_pixel(32, 16, Rgb([200, 0, 0])).save(&path).unwrap();

        let display = load_for_display(&path, 500).unwrap();
        assert_eq!((display.width, display.height), (32, 16));
    }

    #[test]
    fn test_corrupt_files_report_decode_errors() {
        let dir = TempDir::new().unwrap();
        let png = dir.path().join("broken.png");
        let dcm = dir.path().join("broken.dcm");
        fs::write(&png, b"definitely not a png").unwrap();
        fs::write(&dcm, b"definitely not dicom").unwrap();

        assert!(load_for_display(&png, 500).is_err());
        assert!(matches!(
            load_for_display(&dcm, 500),
            Err(LabelerError::Decode { .. })
        ));
    }

    #[test]
    fn test_dicom_is_stretched_to_gray_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.dcm");
        write_mono_dicom(&path);

        let display = load_for_display(&path, 500).unwrap();

        assert_eq!((display.width, display.height), (4, 2));
        let gray: Vec<u8> = display.rgba.chunks_exact(4).map(|px| px[0]).collect();
        assert_eq!(gray, vec![0, 36, 72, 109, 145, 182, 218, 255]);
        assert!(display
            .rgba
            .chunks_exact(4)
            .all(|px| px[0] == px[1] && px[1] == px[2] && px[3] == 255));
    }

    #[test]
    fn test_dicom_extension_detection() {
        assert!(is_dicom(Path::new("/x/scan.DCM")));
        assert!(is_dicom(Path::new("/x/scan.dicom")));
        assert!(!is_dicom(Path::new("/x/scan.png")));
        assert!(!is_dicom(Path::new("/x/dcm")));
    }
}

//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Detect format | `image::ImageReader::with_guessed_format` |
//! | Identify | `ImageReader::into_dimensions` (header only, no full decode) |
//! | Verify | `ImageReader::decode` (every pixel) |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (honours quality) |
//! | Encode → PNG, TIFF, WebP | `DynamicImage::write_to` (lossless) |
//!
//! Output always uses the format detected from the source bytes, never the
//! format implied by the target filename.

use super::backend::{BackendError, Dimensions, EncodedImage, ImageBackend};
use super::calculations::calculate_fit_dimensions;
use super::params::{Quality, ResizeParams};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat, ImageReader};
use std::io::Cursor;

/// Extensions whose decoders are compiled in.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

/// Returns `true` if uploads with this extension (with or without the
/// leading dot, any case) can be decoded.
pub fn is_supported_extension(ext: &str) -> bool {
    let ext = ext.trim_start_matches('.');
    PHOTO_CANDIDATES
        .iter()
        .any(|(candidate, fmt)| candidate.eq_ignore_ascii_case(ext) && fmt.reading_enabled())
}

/// Backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn reader(data: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, BackendError> {
    let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
    if reader.format().is_none() {
        return Err(BackendError::Decode("unrecognized image format".into()));
    }
    Ok(reader)
}

/// Decode the source and report the format it was stored in.
fn load_image(data: &[u8]) -> Result<(DynamicImage, ImageFormat), BackendError> {
    let reader = reader(data)?;
    let format = reader
        .format()
        .ok_or_else(|| BackendError::Decode("unrecognized image format".into()))?;
    let img = reader
        .decode()
        .map_err(|e| BackendError::Decode(format!("{format:?}: {e}")))?;
    Ok((img, format))
}

/// Encode `img` in `format`, converting pixel layouts the encoder rejects.
fn encode_image(
    img: &DynamicImage,
    format: ImageFormat,
    quality: Quality,
) -> Result<Vec<u8>, BackendError> {
    let mut buf = Cursor::new(Vec::new());
    let result = match format {
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel.
            let rgb = img.to_rgb8();
            JpegEncoder::new_with_quality(&mut buf, quality.value() as u8).write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )
        }
        ImageFormat::WebP => DynamicImage::ImageRgba8(img.to_rgba8()).write_to(&mut buf, format),
        other => img.write_to(&mut buf, other),
    };
    result.map_err(|e| BackendError::Encode(format!("{format:?}: {e}")))?;
    Ok(buf.into_inner())
}

impl ImageBackend for RustBackend {
    fn identify(&self, data: &[u8]) -> Result<Dimensions, BackendError> {
        let (width, height) = reader(data)?
            .into_dimensions()
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(Dimensions { width, height })
    }

    fn verify(&self, data: &[u8]) -> Result<Dimensions, BackendError> {
        let (img, _) = load_image(data)?;
        Ok(Dimensions {
            width: img.width(),
            height: img.height(),
        })
    }

    fn resize(&self, params: &ResizeParams<'_>) -> Result<EncodedImage, BackendError> {
        let (img, format) = load_image(params.source)?;
        let (width, height) = calculate_fit_dimensions(
            (img.width(), img.height()),
            (params.max_width, params.max_height),
        );
        let resized = if (width, height) == (img.width(), img.height()) {
            img
        } else {
            img.resize_exact(width, height, FilterType::Lanczos3)
        };
        let bytes = encode_image(&resized, format, params.quality)?;
        Ok(EncodedImage {
            bytes,
            dimensions: Dimensions { width, height },
        })
    }
}

//! Decoding, color coercion and canonical re-encoding of uploaded images.

use bytes::Bytes;
use exif::{In, Reader, Tag};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;
use tracing::debug;

use crate::error::VisionError;
use crate::model::{ColorMode, NormalizedImage, UploadedImage};

/// Every normalized image is sent as JPEG.
pub const NORMALIZED_MIME_TYPE: &str = "image/jpeg";

pub const DEFAULT_JPEG_QUALITY: u8 = 75;

#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// JPEG quality, 1-100
    pub jpeg_quality: u8,
    /// Rotate/flip according to the EXIF orientation tag before encoding
    pub apply_orientation: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            apply_orientation: true,
        }
    }
}

impl NormalizeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn with_orientation(mut self, apply: bool) -> Self {
        self.apply_orientation = apply;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImageNormalizer {
    options: NormalizeOptions,
}

impl ImageNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: NormalizeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &NormalizeOptions {
        &self.options
    }

    /// Normalize an upload. The container is sniffed from the bytes; a
    /// mismatching declared type is only logged.
    pub fn normalize_upload(&self, upload: &UploadedImage) -> Result<NormalizedImage, VisionError> {
        if let (Some(declared), Some(sniffed)) = (&upload.declared_mime, upload.sniffed_mime()) {
            if !declared.eq_ignore_ascii_case(sniffed) {
                debug!(declared = %declared, sniffed, "declared media type does not match content");
            }
        }
        self.normalize(&upload.data)
    }

    /// Decode `raw`, coerce it to RGB or grayscale and re-encode it as JPEG.
    ///
    /// The output depends only on `raw` and the options, so normalizing the
    /// same bytes twice yields identical buffers.
    pub fn normalize(&self, raw: &[u8]) -> Result<NormalizedImage, VisionError> {
        let decoded = decode(raw)?;
        let source_color = decoded.color();

        let oriented = if self.options.apply_orientation {
            apply_orientation(decoded, exif_orientation(raw))
        } else {
            decoded
        };

        let (bitmap, color) = coerce_color(oriented);
        let data = encode_jpeg(&bitmap, self.options.jpeg_quality)?;

        debug!(
            source_color = ?source_color,
            color = ?color,
            width = bitmap.width(),
            height = bitmap.height(),
            input_bytes = raw.len(),
            output_bytes = data.len(),
            "normalized image"
        );

        Ok(NormalizedImage::new(
            data,
            NORMALIZED_MIME_TYPE,
            bitmap.width(),
            bitmap.height(),
            color,
        ))
    }
}

/// Normalize with default options.
pub fn normalize(raw: &[u8]) -> Result<NormalizedImage, VisionError> {
    ImageNormalizer::new().normalize(raw)
}

fn decode(raw: &[u8]) -> Result<DynamicImage, VisionError> {
    if raw.is_empty() {
        return Err(VisionError::Decode("input is empty".to_string()));
    }

    let reader = ImageReader::new(Cursor::new(raw))
        .with_guessed_format()
        .map_err(VisionError::decode)?;

    if reader.format().is_none() {
        return Err(VisionError::Decode(
            "unrecognized image container".to_string(),
        ));
    }

    reader.decode().map_err(VisionError::decode)
}

/// Keep 8-bit RGB and 8-bit grayscale as they are; everything else
/// (alpha, palette expansions, 16-bit, float) becomes RGB.
fn coerce_color(image: DynamicImage) -> (DynamicImage, ColorMode) {
    let keep = match &image {
        DynamicImage::ImageRgb8(_) => Some(ColorMode::Rgb),
        DynamicImage::ImageLuma8(_) => Some(ColorMode::Grayscale),
        _ => None,
    };

    match keep {
        Some(mode) => (image, mode),
        None => (DynamicImage::ImageRgb8(image.to_rgb8()), ColorMode::Rgb),
    }
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Bytes, VisionError> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    image
        .write_with_encoder(encoder)
        .map_err(|e| VisionError::Encode(e.to_string()))?;
    Ok(Bytes::from(buf))
}

/// EXIF orientation of the input, 1 (upright) when absent or unreadable
fn exif_orientation(raw: &[u8]) -> u32 {
    Reader::new()
        .read_from_container(&mut Cursor::new(raw))
        .ok()
        .and_then(|exif| {
            exif.get_field(Tag::Orientation, In::PRIMARY)
                .and_then(|field| field.value.get_uint(0))
        })
        .unwrap_or(1)
}

fn apply_orientation(image: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}

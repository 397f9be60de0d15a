// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image decoding for uploaded OCR payloads

use std::io::Cursor;

use image::{ImageFormat, ImageReader, Limits};
use thiserror::Error;

use super::pixel_buffer::PixelBuffer;

/// Largest accepted width or height in pixels
pub const MAX_IMAGE_SIDE: u32 = 16_384;

/// Largest allocation the decoder may make (512MB)
pub const MAX_DECODE_ALLOC: u64 = 512 * 1024 * 1024;

/// Reasons uploaded bytes could not become a [`PixelBuffer`]
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Image data is empty")]
    Empty,

    #[error("Unsupported image format")]
    UnsupportedFormat,

    #[error("Failed to decode image: {0}")]
    Corrupt(String),

    #[error("Decoded image has degenerate dimensions {width}x{height}")]
    ZeroDimensions { width: u32, height: u32 },

    #[error("Image exceeds decoder limits: {0}")]
    LimitsExceeded(String),
}

/// Image information extracted during decoding
#[derive(Debug, Clone)]
pub struct ImageInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Detected format
    pub format: ImageFormat,
    /// Size of the encoded upload in bytes
    pub size_bytes: usize,
}

/// Bounds applied while decoding
#[derive(Debug, Clone, Copy)]
pub struct DecodeLimits {
    pub max_side: u32,
    pub max_alloc: u64,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_side: MAX_IMAGE_SIDE,
            max_alloc: MAX_DECODE_ALLOC,
        }
    }
}

/// Decode raw upload bytes into a 3-channel BGR buffer
///
/// The format is taken from the content, never from a declared MIME type.
/// Alpha channels are dropped; grayscale is expanded to three channels.
///
/// # Returns
/// * `Ok((PixelBuffer, ImageInfo))` - buffer with positive width and height
/// * `Err(DecodeError)` - empty, unrecognized, corrupt or degenerate input
pub fn decode_image_bytes(bytes: &[u8]) -> Result<(PixelBuffer, ImageInfo), DecodeError> {
    decode_with_limits(bytes, DecodeLimits::default())
}

/// Same as [`decode_image_bytes`] with explicit decoder limits
pub fn decode_with_limits(
    bytes: &[u8],
    limits: DecodeLimits,
) -> Result<(PixelBuffer, ImageInfo), DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    let format = detect_format(bytes)?;

    let mut decoder_limits = Limits::default();
    decoder_limits.max_image_width = Some(limits.max_side);
    decoder_limits.max_image_height = Some(limits.max_side);
    decoder_limits.max_alloc = Some(limits.max_alloc);

    let mut reader = ImageReader::with_format(Cursor::new(bytes), format);
    reader.limits(decoder_limits);

    let img = reader.decode().map_err(|e| match e {
        image::ImageError::Limits(limit) => DecodeError::LimitsExceeded(limit.to_string()),
        other => DecodeError::Corrupt(other.to_string()),
    })?;

    if img.width() == 0 || img.height() == 0 {
        return Err(DecodeError::ZeroDimensions {
            width: img.width(),
            height: img.height(),
        });
    }

    let buffer = PixelBuffer::from_dynamic_image(&img)?;
    let info = ImageInfo {
        width: buffer.width(),
        height: buffer.height(),
        format,
        size_bytes: bytes.len(),
    };

    Ok((buffer, info))
}

/// Detect image format from magic bytes
///
/// # Returns
/// * `Ok(ImageFormat)` - Detected format
/// * `Err(DecodeError::UnsupportedFormat)` - If format cannot be detected
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, DecodeError> {
    if bytes.len() < 4 {
        return Err(DecodeError::UnsupportedFormat);
    }

    match bytes {
        // PNG: 89 50 4E 47 (0x89 P N G)
        [0x89, 0x50, 0x4E, 0x47, ..] => Ok(ImageFormat::Png),

        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Ok(ImageFormat::Jpeg),

        // WebP: RIFF .... WEBP
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Ok(ImageFormat::WebP),

        // GIF: GIF87a or GIF89a
        [0x47, 0x49, 0x46, 0x38, x, ..] if *x == 0x37 || *x == 0x39 => Ok(ImageFormat::Gif),

        // BMP: BM
        [0x42, 0x4D, ..] => Ok(ImageFormat::Bmp),

        // TIFF: II (little-endian) or MM (big-endian)
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => Ok(ImageFormat::Tiff),

        _ => Err(DecodeError::UnsupportedFormat),
    }
}

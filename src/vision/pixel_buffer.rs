// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Decoded image samples handed to the recognition engine

use image::{DynamicImage, Rgb, RgbImage};

use super::image_utils::DecodeError;

/// Number of color channels in every buffer (blue, green, red)
pub const CHANNELS: usize = 3;

/// A decoded image as a height x width x channel grid of `u8` samples
///
/// Samples are stored row-major and interleaved in BGR order, the layout
/// PaddleOCR models are trained on. Width and height are always positive;
/// the constructors refuse anything else.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &CHANNELS)
            .finish_non_exhaustive()
    }
}

impl PixelBuffer {
    /// Build a buffer from interleaved BGR samples
    pub fn from_bgr(width: u32, height: u32, data: Vec<u8>) -> Result<Self, DecodeError> {
        if width == 0 || height == 0 {
            return Err(DecodeError::ZeroDimensions { width, height });
        }

        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(DecodeError::Corrupt(format!(
                "expected {} samples for {}x{}x{}, got {}",
                expected,
                width,
                height,
                CHANNELS,
                data.len()
            )));
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Convert a decoded image into a BGR buffer
    ///
    /// Alpha is dropped and grayscale is expanded to three channels.
    pub fn from_dynamic_image(image: &DynamicImage) -> Result<Self, DecodeError> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let mut data = rgb.into_raw();
        for pixel in data.chunks_exact_mut(CHANNELS) {
            pixel.swap(0, 2);
        }

        Self::from_bgr(width, height, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> usize {
        CHANNELS
    }

    /// (height, width, channels)
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.height as usize, self.width as usize, CHANNELS)
    }

    /// Raw interleaved BGR samples
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// BGR samples at (x, y), or `None` outside the buffer
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * CHANNELS;
        Some([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ])
    }

    /// Copy the samples back into an RGB image for resizing and cropping
    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let offset = (y as usize * self.width as usize + x as usize) * CHANNELS;
            Rgb([
                self.data[offset + 2],
                self.data[offset + 1],
                self.data[offset],
            ])
        })
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for PaddleOCR
//!
//! All tensors are NCHW with channels in BGR order, which is what the
//! PaddleOCR models were trained on.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use ndarray::Array4;

use super::engine::BoundingBox;

/// Target size for PaddleOCR detection model
pub const OCR_INPUT_SIZE: u32 = 640;

/// Recognition model input height (PP-OCRv4/v5 use 48)
pub const REC_INPUT_HEIGHT: u32 = 48;

/// Maximum width for recognition model input
pub const REC_MAX_WIDTH: u32 = 1280;

/// Angle classifier input (height, width)
pub const CLS_INPUT_HEIGHT: u32 = 48;
pub const CLS_INPUT_WIDTH: u32 = 192;

/// Mean values for detection normalization (ImageNet)
pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Std values for detection normalization (ImageNet)
pub const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Sample of `pixel` for tensor channel `c` (0 = blue, 1 = green, 2 = red)
fn bgr_sample(pixel: &Rgb<u8>, c: usize) -> f32 {
    pixel[2 - c] as f32 / 255.0
}

/// Preprocess an image for OCR detection
///
/// Steps:
/// 1. Resize with aspect ratio preservation to OCR_INPUT_SIZE
/// 2. Pad to square with gray (128) background
/// 3. Normalize with ImageNet mean/std: (pixel/255 - mean) / std
/// 4. Convert to NCHW tensor format [1, 3, H, W]
pub fn preprocess_for_detection(image: &RgbImage) -> (Array4<f32>, PreprocessInfo) {
    let info = PreprocessInfo::new(image.width(), image.height(), OCR_INPUT_SIZE);
    let padded = resize_with_padding(image, OCR_INPUT_SIZE);

    let size = OCR_INPUT_SIZE as usize;
    let mut tensor = Array4::zeros((1, 3, size, size));

    for (x, y, pixel) in padded.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (bgr_sample(pixel, c) - MEAN[c]) / STD[c];
        }
    }

    (tensor, info)
}

/// Preprocess a text line crop for the angle classifier
///
/// Resized to height 48 keeping aspect ratio (capped at width 192), normalized
/// to [-1, 1] and right-padded with zeros to [1, 3, 48, 192].
pub fn preprocess_for_classification(crop: &RgbImage) -> Array4<f32> {
    let resized = resize_to_height(crop, CLS_INPUT_HEIGHT, CLS_INPUT_WIDTH);

    let mut tensor = Array4::zeros((
        1,
        3,
        CLS_INPUT_HEIGHT as usize,
        CLS_INPUT_WIDTH as usize,
    ));
    fill_centered(&mut tensor, &resized);
    tensor
}

/// Preprocess a cropped text region for recognition
///
/// Resized to height 48 with dynamic width (aspect ratio preserved, at least
/// 4 and at most REC_MAX_WIDTH pixels), normalized to [-1, 1].
pub fn preprocess_for_recognition(crop: &RgbImage) -> Array4<f32> {
    let resized = resize_to_height(crop, REC_INPUT_HEIGHT, REC_MAX_WIDTH);

    let mut tensor = Array4::zeros((
        1,
        3,
        REC_INPUT_HEIGHT as usize,
        resized.width() as usize,
    ));
    fill_centered(&mut tensor, &resized);
    tensor
}

fn resize_to_height(image: &RgbImage, height: u32, max_width: u32) -> RgbImage {
    let (orig_w, orig_h) = image.dimensions();
    let scale = height as f32 / orig_h.max(1) as f32;
    let width = ((orig_w as f32 * scale).round() as u32).clamp(4, max_width);

    imageops::resize(image, width, height, FilterType::Triangle)
}

/// Write `(pixel/255 - 0.5) / 0.5` into the top-left of `tensor`
fn fill_centered(tensor: &mut Array4<f32>, image: &RgbImage) {
    for (x, y, pixel) in image.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (bgr_sample(pixel, c) - 0.5) / 0.5;
        }
    }
}

/// Resize image with aspect ratio preservation and padding
///
/// The image is scaled to fit within target_size x target_size
/// while preserving aspect ratio, then padded with gray (128)
/// to reach the target dimensions.
pub fn resize_with_padding(image: &RgbImage, target_size: u32) -> RgbImage {
    let mut output = RgbImage::from_pixel(target_size, target_size, Rgb([128, 128, 128]));

    let (orig_w, orig_h) = image.dimensions();
    if orig_w == 0 || orig_h == 0 {
        return output;
    }

    let info = PreprocessInfo::new(orig_w, orig_h, target_size);
    let resized = imageops::resize(image, info.resized_width, info.resized_height, FilterType::Lanczos3);

    imageops::replace(&mut output, &resized, info.offset_x as i64, info.offset_y as i64);
    output
}

/// Copy `bbox` out of `image`, clamped to the image bounds
///
/// Returns `None` when the clamped box is empty.
pub fn crop_region(image: &RgbImage, bbox: &BoundingBox) -> Option<RgbImage> {
    let (img_w, img_h) = image.dimensions();
    if bbox.x >= img_w || bbox.y >= img_h {
        return None;
    }

    let width = bbox.width.min(img_w - bbox.x);
    let height = bbox.height.min(img_h - bbox.y);
    if width == 0 || height == 0 {
        return None;
    }

    Some(imageops::crop_imm(image, bbox.x, bbox.y, width, height).to_image())
}

/// Scaling factor and offsets used during detection preprocessing
/// Used to map detection results back to original coordinates
#[derive(Debug, Clone, Copy)]
pub struct PreprocessInfo {
    /// Scale factor applied
    pub scale: f32,
    /// X offset from padding
    pub offset_x: u32,
    /// Y offset from padding
    pub offset_y: u32,
    /// Width after scaling, before padding
    pub resized_width: u32,
    /// Height after scaling, before padding
    pub resized_height: u32,
    /// Original image width
    pub original_width: u32,
    /// Original image height
    pub original_height: u32,
}

impl PreprocessInfo {
    pub fn new(orig_w: u32, orig_h: u32, target_size: u32) -> Self {
        if orig_w == 0 || orig_h == 0 {
            return Self {
                scale: 1.0,
                offset_x: 0,
                offset_y: 0,
                resized_width: 0,
                resized_height: 0,
                original_width: orig_w,
                original_height: orig_h,
            };
        }

        let scale = (target_size as f32 / orig_w as f32).min(target_size as f32 / orig_h as f32);
        let resized_width = ((orig_w as f32 * scale).round() as u32).clamp(1, target_size);
        let resized_height = ((orig_h as f32 * scale).round() as u32).clamp(1, target_size);

        Self {
            scale,
            offset_x: (target_size - resized_width) / 2,
            offset_y: (target_size - resized_height) / 2,
            resized_width,
            resized_height,
            original_width: orig_w,
            original_height: orig_h,
        }
    }

    /// Map a coordinate from preprocessed space back to original image space
    pub fn map_to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let orig_x = (x - self.offset_x as f32) / self.scale;
        let orig_y = (y - self.offset_y as f32) / self.scale;
        (orig_x, orig_y)
    }

    /// Map a preprocessed-space rectangle to a clamped box in the original image
    pub fn map_box(&self, x: f32, y: f32, width: f32, height: f32) -> Option<BoundingBox> {
        let (x0, y0) = self.map_to_original(x, y);
        let (x1, y1) = self.map_to_original(x + width, y + height);

        let max_x = self.original_width as f32;
        let max_y = self.original_height as f32;
        let x0 = x0.clamp(0.0, max_x).floor();
        let y0 = y0.clamp(0.0, max_y).floor();
        let x1 = x1.clamp(0.0, max_x).ceil();
        let y1 = y1.clamp(0.0, max_y).ceil();

        if x1 - x0 < 1.0 || y1 - y0 < 1.0 {
            return None;
        }

        Some(BoundingBox {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }
}

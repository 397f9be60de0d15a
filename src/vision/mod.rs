// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module for CPU-based text extraction
//!
//! This module provides:
//! - Upload decoding into BGR pixel buffers
//! - OCR (Optical Character Recognition) via PaddleOCR
//! - The model manager that serializes access to the loaded engine

pub mod image_utils;
pub mod model_manager;
pub mod ocr;
pub mod pixel_buffer;

pub use image_utils::{decode_image_bytes, detect_format, DecodeError, DecodeLimits, ImageInfo};
pub use model_manager::{VisionModelConfig, VisionModelManager};
pub use pixel_buffer::PixelBuffer;

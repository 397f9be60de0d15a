// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Recognition engine contract consumed by the request pipeline

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::vision::PixelBuffer;

/// Bounding box for recognized text, in original image pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A recognized text span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRegion {
    /// Recognized text content
    pub text: String,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// Location of the span
    pub bounding_box: BoundingBox,
}

impl TextRegion {
    /// Region carrying only text, for engines without geometry
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: 1.0,
            bounding_box: BoundingBox {
                x: 0,
                y: 0,
                width: 0,
                height: 0,
            },
        }
    }
}

/// Options fixed when the engine is loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionOptions {
    /// PaddleOCR language code (en, ch, japan, ...)
    pub language: String,
    /// Classify text line orientation and flip upside-down lines
    pub use_angle_cls: bool,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            use_angle_cls: true,
        }
    }
}

/// Failures raised by a recognition engine on a valid buffer
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("image {width}x{height} is below the minimum side of {min} pixels")]
    InputTooSmall { width: u32, height: u32, min: u32 },

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("recognition timed out after {0:?}")]
    Timeout(Duration),

    #[error("recognition engine unavailable: {0}")]
    Unavailable(String),

    #[error("recognition worker panicked")]
    WorkerPanicked,
}

/// Text recognition over a decoded image
///
/// Implementations return regions in reading order as they define it; callers
/// do not reorder them. An image without text yields an empty vector.
/// Calls are blocking and may come from several threads at once.
#[cfg_attr(test, mockall::automock)]
pub trait RecognitionEngine: Send + Sync {
    fn recognize(&self, image: &PixelBuffer) -> Result<Vec<TextRegion>, EngineError>;

    /// Short identifier used in logs
    fn name(&self) -> &str {
        "unnamed"
    }
}

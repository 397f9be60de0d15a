// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PaddleOCR integration for text extraction from images
//!
//! Components:
//! - `engine` - Recognition contract used by request handling
//! - `detection` - Text region detection
//! - `classification` - Text line orientation (0°/180°)
//! - `recognition` - Text recognition from detected regions
//! - `preprocessing` - Image preprocessing for models
//! - `model` - Combined OCR pipeline
//! - `assembly` - Joins region texts into the response

pub mod assembly;
pub mod classification;
pub mod detection;
pub mod engine;
pub mod model;
pub mod preprocessing;
pub mod recognition;

pub use assembly::assemble_text;
pub use classification::{AnglePrediction, LineOrientation, OcrAngleClassifier};
pub use detection::{DetectionParams, OcrDetectionModel, TextBox};
pub use engine::{BoundingBox, EngineError, RecognitionEngine, RecognitionOptions, TextRegion};
pub use model::{PaddleOcrEngine, PaddleOcrPaths, MIN_IMAGE_SIDE};
pub use recognition::{OcrRecognitionModel, RecognizedText};

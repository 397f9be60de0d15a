// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PaddleOCR pipeline: detection, optional angle classification, recognition

use anyhow::{Context, Result};
use image::imageops;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use super::classification::OcrAngleClassifier;
use super::detection::OcrDetectionModel;
use super::engine::{EngineError, RecognitionEngine, RecognitionOptions, TextRegion};
use super::preprocessing::{
    crop_region, preprocess_for_classification, preprocess_for_detection,
    preprocess_for_recognition,
};
use super::recognition::OcrRecognitionModel;
use crate::vision::PixelBuffer;

/// Images with a side shorter than this are rejected by the engine
pub const MIN_IMAGE_SIDE: u32 = 4;

/// Files making up one PaddleOCR model set
///
/// ```text
/// <model_dir>/det_model.onnx
/// <model_dir>/cls_model.onnx
/// <model_dir>/<language>/rec_model.onnx
/// <model_dir>/<language>/dict.txt
/// ```
#[derive(Debug, Clone)]
pub struct PaddleOcrPaths {
    pub detection: PathBuf,
    pub classification: PathBuf,
    pub recognition: PathBuf,
    pub dictionary: PathBuf,
}

impl PaddleOcrPaths {
    pub fn new(model_dir: &Path, language: &str) -> Self {
        let language_dir = model_dir.join(language);
        Self {
            detection: model_dir.join("det_model.onnx"),
            classification: model_dir.join("cls_model.onnx"),
            recognition: language_dir.join("rec_model.onnx"),
            dictionary: language_dir.join("dict.txt"),
        }
    }
}

/// PaddleOCR model for text extraction
///
/// Combines text detection, angle classification and recognition models for
/// end-to-end OCR. Runs on CPU only.
#[derive(Debug)]
pub struct PaddleOcrEngine {
    detection: OcrDetectionModel,
    classifier: Option<OcrAngleClassifier>,
    recognition: OcrRecognitionModel,
}

impl PaddleOcrEngine {
    /// Load PaddleOCR models from the specified directory
    ///
    /// The angle classifier is only loaded when `options.use_angle_cls` is set.
    pub async fn new(
        model_dir: &Path,
        options: RecognitionOptions,
        intra_threads: usize,
    ) -> Result<Self> {
        let paths = PaddleOcrPaths::new(model_dir, &options.language);
        debug!("Loading PaddleOCR models: {:?}", paths);

        let detection = OcrDetectionModel::new(&paths.detection, intra_threads)
            .await
            .context("Failed to load detection model")?;

        let classifier = if options.use_angle_cls {
            Some(
                OcrAngleClassifier::new(&paths.classification, intra_threads)
                    .await
                    .context("Failed to load angle classifier")?,
            )
        } else {
            None
        };

        let recognition =
            OcrRecognitionModel::new(&paths.recognition, &paths.dictionary, intra_threads)
                .await
                .context(format!(
                    "Failed to load recognition model for language '{}'",
                    options.language
                ))?;

        info!(
            "✅ PaddleOCR loaded (language: {}, angle classification: {})",
            options.language, options.use_angle_cls
        );

        Ok(Self {
            detection,
            classifier,
            recognition,
        })
    }

    fn run(&self, image: &PixelBuffer) -> Result<Vec<TextRegion>> {
        let start = Instant::now();
        let rgb = image.to_rgb_image();

        let (tensor, info) = preprocess_for_detection(&rgb);
        let boxes = self.detection.detect(&tensor)?;

        let mut regions = Vec::with_capacity(boxes.len());
        for text_box in &boxes {
            let Some(bounding_box) =
                info.map_box(text_box.x, text_box.y, text_box.width, text_box.height)
            else {
                continue;
            };
            let Some(mut crop) = crop_region(&rgb, &bounding_box) else {
                continue;
            };

            if let Some(classifier) = &self.classifier {
                let prediction = classifier.classify(&preprocess_for_classification(&crop))?;
                if prediction.needs_flip(classifier.threshold()) {
                    crop = imageops::rotate180(&crop);
                }
            }

            let recognized = self
                .recognition
                .recognize(&preprocess_for_recognition(&crop))?;
            if recognized.is_empty() {
                continue;
            }

            regions.push(TextRegion {
                text: recognized.text,
                confidence: recognized.confidence * text_box.confidence,
                bounding_box,
            });
        }

        debug!(
            "PaddleOCR: {} boxes, {} regions, {}ms",
            boxes.len(),
            regions.len(),
            start.elapsed().as_millis()
        );

        Ok(regions)
    }
}

impl RecognitionEngine for PaddleOcrEngine {
    fn recognize(&self, image: &PixelBuffer) -> Result<Vec<TextRegion>, EngineError> {
        if image.width() < MIN_IMAGE_SIDE || image.height() < MIN_IMAGE_SIDE {
            return Err(EngineError::InputTooSmall {
                width: image.width(),
                height: image.height(),
                min: MIN_IMAGE_SIDE,
            });
        }

        self.run(image)
            .map_err(|e| EngineError::Inference(format!("{:#}", e)))
    }

    fn name(&self) -> &str {
        "paddleocr"
    }
}

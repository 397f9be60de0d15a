// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! End-to-end tests against real PaddleOCR model files
//!
//! Run with: OCR_MODEL_DIR=/path/to/paddleocr-onnx cargo test -- --ignored

use image::{DynamicImage, Rgb, RgbImage};
use paddle_ocr_server::vision::{ocr::RecognitionOptions, PixelBuffer, VisionModelConfig, VisionModelManager};
use std::path::PathBuf;
use std::time::Duration;

fn model_config(use_angle_cls: bool) -> VisionModelConfig {
    let ocr_model_dir = std::env::var("OCR_MODEL_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./models/paddleocr-onnx"));

    VisionModelConfig {
        ocr_model_dir,
        options: RecognitionOptions {
            language: "en".to_string(),
            use_angle_cls,
        },
        intra_threads: 2,
        max_concurrent_recognitions: 1,
        recognition_timeout: Duration::from_secs(60),
    }
}

fn blank_page() -> PixelBuffer {
    let blank = RgbImage::from_pixel(480, 160, Rgb([255, 255, 255]));
    PixelBuffer::from_dynamic_image(&DynamicImage::ImageRgb8(blank)).unwrap()
}

#[tokio::test]
#[ignore = "requires PaddleOCR ONNX models"]
async fn test_manager_loads_and_reads_blank_page() {
    let manager = VisionModelManager::new(model_config(true)).await.unwrap();

    assert_eq!(manager.engine_name(), "paddleocr");
    let regions = manager.recognize(blank_page()).await.unwrap();
    assert!(regions.is_empty());
}

#[tokio::test]
#[ignore = "requires PaddleOCR ONNX models"]
async fn test_manager_without_angle_classifier() {
    let manager = VisionModelManager::new(model_config(false)).await.unwrap();

    let first = manager.recognize(blank_page()).await.unwrap();
    let second = manager.recognize(blank_page()).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
#[ignore = "requires PaddleOCR ONNX models"]
async fn test_unknown_language_fails_to_load() {
    let mut config = model_config(false);
    config.options.language = "no-such-language".to_string();

    assert!(VisionModelManager::new(config).await.is_err());
}

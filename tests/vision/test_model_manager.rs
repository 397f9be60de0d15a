// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! VisionModelManager tests with in-process engines

use paddle_ocr_server::vision::{
    ocr::{EngineError, RecognitionEngine, TextRegion},
    PixelBuffer, VisionModelConfig, VisionModelManager,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn buffer() -> PixelBuffer {
    PixelBuffer::from_bgr(8, 8, vec![255; 8 * 8 * 3]).unwrap()
}

/// Tracks how many calls overlap
#[derive(Default)]
struct GaugeEngine {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl RecognitionEngine for GaugeEngine {
    fn recognize(&self, _image: &PixelBuffer) -> Result<Vec<TextRegion>, EngineError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(30));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(vec![TextRegion::from_text("ok")])
    }
}

/// Panics on the first call only
#[derive(Default)]
struct PanicOnceEngine {
    panicked: AtomicBool,
}

impl RecognitionEngine for PanicOnceEngine {
    fn recognize(&self, _image: &PixelBuffer) -> Result<Vec<TextRegion>, EngineError> {
        if !self.panicked.swap(true, Ordering::SeqCst) {
            panic!("engine blew up");
        }
        Ok(vec![TextRegion::from_text("recovered")])
    }
}

#[test]
fn test_default_config() {
    let config = VisionModelConfig::default();

    assert_eq!(config.ocr_model_dir, PathBuf::from("./models/paddleocr-onnx"));
    assert_eq!(config.options.language, "en");
    assert!(config.options.use_angle_cls);
    assert_eq!(config.max_concurrent_recognitions, 2);
    assert_eq!(config.recognition_timeout, Duration::from_secs(30));
}

#[tokio::test]
async fn test_missing_model_dir_fails_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let config = VisionModelConfig {
        ocr_model_dir: dir.path().join("nope"),
        ..Default::default()
    };

    assert!(VisionModelManager::new(config).await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_is_bounded() {
    let engine = Arc::new(GaugeEngine::default());
    let manager = Arc::new(VisionModelManager::with_engine(
        engine.clone(),
        2,
        Duration::from_secs(5),
    ));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.recognize(buffer()).await })
        })
        .collect();

    for task in tasks {
        assert!(task.await.unwrap().is_ok());
    }

    assert!(engine.peak.load(Ordering::SeqCst) <= 2);
    assert_eq!(engine.in_flight.load(Ordering::SeqCst), 0);
}

/// Sleeps inside the engine call
struct SleepyEngine(Duration);

impl RecognitionEngine for SleepyEngine {
    fn recognize(&self, _image: &PixelBuffer) -> Result<Vec<TextRegion>, EngineError> {
        std::thread::sleep(self.0);
        Ok(vec![TextRegion::from_text("late")])
    }
}

#[tokio::test]
async fn test_recognition_leaves_runtime_free() {
    let manager = Arc::new(VisionModelManager::with_engine(
        Arc::new(SleepyEngine(Duration::from_millis(400))),
        1,
        Duration::from_secs(5),
    ));

    let start = Instant::now();
    let running = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.recognize(buffer()).await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(start.elapsed() < Duration::from_millis(300));
    assert!(!running.is_finished());

    let regions = running.await.unwrap().unwrap();
    assert_eq!(regions[0].text, "late");
}

#[tokio::test]
async fn test_panicking_engine_does_not_take_down_manager() {
    let manager = VisionModelManager::with_engine(
        Arc::new(PanicOnceEngine::default()),
        1,
        Duration::from_secs(5),
    );

    let first = manager.recognize(buffer()).await;
    assert!(matches!(first, Err(EngineError::WorkerPanicked)));

    let second = manager.recognize(buffer()).await.unwrap();
    assert_eq!(second[0].text, "recovered");
}

#[tokio::test]
async fn test_zero_concurrency_is_clamped() {
    let manager =
        VisionModelManager::with_engine(Arc::new(GaugeEngine::default()), 0, Duration::from_secs(1));

    assert_eq!(manager.max_concurrent(), 1);
    assert_eq!(manager.engine_name(), "unnamed");
    assert!(manager.recognize(buffer()).await.is_ok());
}

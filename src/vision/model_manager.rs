// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision model manager: owns the loaded recognition engine
//!
//! Request handlers never touch ONNX sessions directly. They go through
//! [`VisionModelManager::recognize`], which runs the blocking engine call on
//! tokio's blocking pool, bounds how many run at once and how long a request
//! may wait for one.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::vision::ocr::{EngineError, PaddleOcrEngine, RecognitionEngine, RecognitionOptions, TextRegion};
use crate::vision::PixelBuffer;

/// Configuration for loading vision models
#[derive(Debug, Clone)]
pub struct VisionModelConfig {
    /// Path to the PaddleOCR model directory
    pub ocr_model_dir: PathBuf,
    /// Language and orientation settings
    pub options: RecognitionOptions,
    /// ONNX Runtime intra-op threads per session
    pub intra_threads: usize,
    /// Recognitions allowed to run at the same time
    pub max_concurrent_recognitions: usize,
    /// Upper bound on queueing plus recognition time per request
    pub recognition_timeout: Duration,
}

impl Default for VisionModelConfig {
    fn default() -> Self {
        Self {
            ocr_model_dir: PathBuf::from("./models/paddleocr-onnx"),
            options: RecognitionOptions::default(),
            intra_threads: 4,
            max_concurrent_recognitions: 2,
            recognition_timeout: Duration::from_secs(30),
        }
    }
}

/// Shared, read-only handle to the recognition engine
pub struct VisionModelManager {
    engine: Arc<dyn RecognitionEngine>,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
    recognition_timeout: Duration,
}

impl std::fmt::Debug for VisionModelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionModelManager")
            .field("max_concurrent", &self.max_concurrent)
            .field("available_permits", &self.permits.available_permits())
            .field("recognition_timeout", &self.recognition_timeout)
            .finish_non_exhaustive()
    }
}

impl VisionModelManager {
    /// Load PaddleOCR from `config.ocr_model_dir`
    pub async fn new(config: VisionModelConfig) -> anyhow::Result<Self> {
        let engine = PaddleOcrEngine::new(
            &config.ocr_model_dir,
            config.options.clone(),
            config.intra_threads,
        )
        .await?;

        info!(
            "✅ PaddleOCR model loaded from {}",
            config.ocr_model_dir.display()
        );

        Ok(Self::with_engine(
            Arc::new(engine),
            config.max_concurrent_recognitions,
            config.recognition_timeout,
        ))
    }

    /// Wrap an already constructed engine
    pub fn with_engine(
        engine: Arc<dyn RecognitionEngine>,
        max_concurrent: usize,
        recognition_timeout: Duration,
    ) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            engine,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            recognition_timeout,
        }
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn recognition_timeout(&self) -> Duration {
        self.recognition_timeout
    }

    /// Run recognition without blocking the async runtime
    ///
    /// Waiting for a free slot counts toward the timeout. On timeout the
    /// blocking call keeps its slot until it actually returns.
    pub async fn recognize(&self, image: PixelBuffer) -> Result<Vec<TextRegion>, EngineError> {
        let start = Instant::now();

        match tokio::time::timeout(self.recognition_timeout, self.dispatch(image)).await {
            Ok(result) => {
                debug!("Recognition finished in {}ms", start.elapsed().as_millis());
                result
            }
            Err(_) => {
                warn!(
                    "Recognition exceeded {:?}, abandoning request",
                    self.recognition_timeout
                );
                Err(EngineError::Timeout(self.recognition_timeout))
            }
        }
    }

    async fn dispatch(&self, image: PixelBuffer) -> Result<Vec<TextRegion>, EngineError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| EngineError::Unavailable("recognition queue closed".to_string()))?;

        let engine = Arc::clone(&self.engine);
        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            engine.recognize(&image)
        });

        match task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => {
                error!("Recognition worker panicked");
                Err(EngineError::WorkerPanicked)
            }
            Err(e) => Err(EngineError::Unavailable(e.to_string())),
        }
    }
}

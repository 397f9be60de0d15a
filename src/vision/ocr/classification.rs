// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PaddleOCR text line orientation classifier
//!
//! Decides whether a cropped text line is upright (0°) or upside down (180°).

use anyhow::{Context, Result};
use ndarray::Array4;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::preprocessing::{CLS_INPUT_HEIGHT, CLS_INPUT_WIDTH};

/// Minimum score for a 180° prediction to trigger a flip
pub const DEFAULT_CLS_THRESHOLD: f32 = 0.9;

/// Orientation of a text line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOrientation {
    Upright,
    UpsideDown,
}

/// Classifier output for one crop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnglePrediction {
    pub orientation: LineOrientation,
    pub score: f32,
}

impl AnglePrediction {
    /// Pick the most likely label from `[p_0deg, p_180deg]` scores
    pub fn from_scores(scores: &[f32]) -> Option<Self> {
        let (index, score) = scores
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))?;

        let orientation = match index {
            0 => LineOrientation::Upright,
            1 => LineOrientation::UpsideDown,
            _ => return None,
        };

        Some(Self { orientation, score })
    }

    /// Whether the crop should be rotated before recognition
    pub fn needs_flip(&self, threshold: f32) -> bool {
        self.orientation == LineOrientation::UpsideDown && self.score >= threshold
    }
}

/// PaddleOCR angle classification model (ch_ppocr_mobile cls)
#[derive(Clone)]
pub struct OcrAngleClassifier {
    session: Arc<Mutex<Session>>,
    input_name: String,
    threshold: f32,
}

impl std::fmt::Debug for OcrAngleClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrAngleClassifier")
            .field("input_name", &self.input_name)
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

impl OcrAngleClassifier {
    /// Load the classifier from `cls_model.onnx`
    pub async fn new<P: AsRef<Path>>(model_path: P, intra_threads: usize) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!(
                "OCR angle classifier model not found: {}",
                model_path.display()
            );
        }

        info!("Loading OCR angle classifier from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(intra_threads)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load OCR angle classifier from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "x".to_string());

        debug!("Angle classifier loaded - input: {}", input_name);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            threshold: DEFAULT_CLS_THRESHOLD,
        })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Classify a tensor produced by `preprocess_for_classification()`
    pub fn classify(&self, input: &Array4<f32>) -> Result<AnglePrediction> {
        let shape = input.shape();
        if shape != [1, 3, CLS_INPUT_HEIGHT as usize, CLS_INPUT_WIDTH as usize] {
            anyhow::bail!(
                "Invalid input shape: {:?}, expected [1, 3, {}, {}]",
                shape,
                CLS_INPUT_HEIGHT,
                CLS_INPUT_WIDTH
            );
        }

        let input_value =
            Value::from_array(input.to_owned()).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Classifier session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .context("Angle classification inference failed")?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let scores: Vec<f32> = output_tensor.iter().copied().collect();
        AnglePrediction::from_scores(&scores)
            .with_context(|| format!("Unexpected classifier output: {:?}", scores))
    }
}

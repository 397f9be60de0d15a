// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! CRNN line recognizer with CTC decoding
//!
//! Input is one cropped, height-48 text line; output is its string and a
//! mean per-character confidence. Index 0 of the dictionary is the CTC blank.

use anyhow::{Context, Result};
use ndarray::{Array4, ArrayView2, Axis, Ix2};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::preprocessing::REC_INPUT_HEIGHT;

/// Recognized text with confidence score
#[derive(Debug, Clone)]
pub struct RecognizedText {
    /// The recognized text content
    pub text: String,
    /// Mean of the per-character confidences (0.0-1.0)
    pub confidence: f32,
    /// Per-character confidences
    pub char_confidences: Vec<f32>,
}

impl RecognizedText {
    pub fn new(text: String, confidence: f32) -> Self {
        Self {
            text,
            confidence,
            char_confidences: Vec::new(),
        }
    }

    /// Check if the text is empty or whitespace only
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// PaddleOCR text recognition model
///
/// Uses a PP-OCR recognition model and its language dictionary.
#[derive(Clone)]
pub struct OcrRecognitionModel {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// CTC class tokens, index 0 is the blank
    dictionary: Arc<Vec<String>>,
    /// Model input name
    input_name: String,
}

impl std::fmt::Debug for OcrRecognitionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrRecognitionModel")
            .field("dictionary_len", &self.dictionary.len())
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

impl OcrRecognitionModel {
    /// Load the OCR recognition model from files
    ///
    /// # Arguments
    /// - `model_path`: Path to the ONNX model file (rec_model.onnx)
    /// - `dict_path`: Path to the character dictionary (dict.txt)
    /// - `intra_threads`: ONNX Runtime intra-op threads
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - Dictionary file not found
    /// - ONNX Runtime initialization fails
    pub async fn new<P: AsRef<Path>>(
        model_path: P,
        dict_path: P,
        intra_threads: usize,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();
        let dict_path = dict_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("OCR recognition model not found: {}", model_path.display());
        }
        if !dict_path.exists() {
            anyhow::bail!(
                "OCR character dictionary not found: {}",
                dict_path.display()
            );
        }

        info!(
            "Loading OCR recognition model from {}",
            model_path.display()
        );

        let dictionary = load_dictionary(dict_path)?;
        info!(
            "Loaded character dictionary with {} characters",
            dictionary.len()
        );

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
                "Failed to load OCR recognition model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "x".to_string());

        debug!("Recognition model loaded - input: {}", input_name);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            dictionary: Arc::new(dictionary),
            input_name,
        })
    }

    /// Recognize text from a preprocessed image tensor
    ///
    /// # Arguments
    /// - `input`: tensor of shape [1, 3, 48, W] from `preprocess_for_recognition()`
    pub fn recognize(&self, input: &Array4<f32>) -> Result<RecognizedText> {
        let shape = input.shape();
        if shape[0] != 1
            || shape[1] != 3
            || shape[2] != REC_INPUT_HEIGHT as usize
            || shape[3] < 4
        {
            anyhow::bail!(
                "Invalid input shape: {:?}, expected [1, 3, {}, W>=4]",
                shape,
                REC_INPUT_HEIGHT
            );
        }

        let input_value =
            Value::from_array(input.to_owned()).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Recognition session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .context("Recognition inference failed")?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        // [batch, seq_len, num_classes] or [seq_len, num_classes]
        let mut probs = output_tensor.view();
        while probs.ndim() > 2 {
            probs = probs.index_axis_move(Axis(0), 0);
        }
        let probs = probs
            .into_dimensionality::<Ix2>()
            .context("Unexpected recognition output shape")?;

        Ok(ctc_greedy_decode(probs, self.dictionary.as_slice()))
    }
}

/// Load a PaddleOCR character dictionary
///
/// One token per line, kept verbatim: a token may span several code points
/// (Indic conjuncts) and blank lines still occupy a class index. Index 0 is
/// reserved for the CTC blank and a trailing space class is appended,
/// matching how the models were exported.
pub fn load_dictionary<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let file = File::open(path.as_ref()).context(format!(
        "Failed to open dictionary: {}",
        path.as_ref().display()
    ))?;

    let reader = BufReader::new(file);
    let mut dictionary = vec![String::new()];

    for line in reader.lines() {
        let line = line.context("Failed to read dictionary line")?;
        dictionary.push(line.trim_end_matches('\r').to_string());
    }

    dictionary.push(" ".to_string());
    Ok(dictionary)
}

/// CTC (Connectionist Temporal Classification) greedy decoding
///
/// Takes the best class at each timestep, drops blanks (index 0) and
/// collapses repeats that are not separated by a blank.
pub fn ctc_greedy_decode<S: AsRef<str>>(probs: ArrayView2<f32>, dictionary: &[S]) -> RecognizedText {
    let mut text = String::new();
    let mut char_confidences = Vec::new();
    let mut prev_index: Option<usize> = None;

    for timestep in probs.outer_iter() {
        let (max_index, max_prob) = timestep.iter().copied().enumerate().fold(
            (0usize, f32::NEG_INFINITY),
            |best, (index, prob)| if prob > best.1 { (index, prob) } else { best },
        );

        if max_index != 0 && Some(max_index) != prev_index {
            if let Some(token) = dictionary.get(max_index) {
                text.push_str(token.as_ref());
                char_confidences.push(max_prob);
            }
        }

        prev_index = if max_index == 0 { None } else { Some(max_index) };
    }

    let confidence = if char_confidences.is_empty() {
        0.0
    } else {
        (char_confidences.iter().sum::<f32>() / char_confidences.len() as f32).clamp(0.0, 1.0)
    };

    RecognizedText {
        text,
        confidence,
        char_confidences,
    }
}

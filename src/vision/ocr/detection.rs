// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! DB text detector
//!
//! Produces axis-aligned boxes in preprocessed (640 padded) coordinates,
//! already sorted in reading order.

use anyhow::{Context, Result};
use ndarray::{Array4, ArrayView2, Axis, Ix2};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::cmp::Ordering;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::preprocessing::OCR_INPUT_SIZE;

/// Expected input size for detection model
pub const DETECTION_INPUT_SIZE: u32 = OCR_INPUT_SIZE; // 640x640

/// Boxes whose top edges are closer than this are treated as one line
const SAME_LINE_TOLERANCE: f32 = 10.0;

/// A detected text box with location and confidence
#[derive(Debug, Clone, PartialEq)]
pub struct TextBox {
    /// X coordinate of top-left corner (in preprocessed image space)
    pub x: f32,
    /// Y coordinate of top-left corner (in preprocessed image space)
    pub y: f32,
    /// Width of the bounding box
    pub width: f32,
    /// Height of the bounding box
    pub height: f32,
    /// Mean probability inside the region (0.0-1.0)
    pub confidence: f32,
}

impl TextBox {
    /// Check if this text box is valid (reasonable dimensions)
    pub fn is_valid(&self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.confidence > 0.0
    }

    /// Calculate area of the bounding box
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Grow the box on every side by `area * ratio / perimeter`
    ///
    /// The probability map marks the shrunk core of each text line, so boxes
    /// are expanded back before cropping.
    pub fn unclip(&self, ratio: f32) -> Self {
        let perimeter = 2.0 * (self.width + self.height);
        if perimeter <= 0.0 {
            return self.clone();
        }
        let distance = self.area() * ratio / perimeter;

        Self {
            x: self.x - distance,
            y: self.y - distance,
            width: self.width + 2.0 * distance,
            height: self.height + 2.0 * distance,
            confidence: self.confidence,
        }
    }
}

/// Thresholds for turning the probability map into boxes
#[derive(Debug, Clone, Copy)]
pub struct DetectionParams {
    /// Pixel probability above which a pixel counts as text
    pub pixel_threshold: f32,
    /// Minimum mean probability for a region to be kept
    pub box_threshold: f32,
    /// Box expansion ratio
    pub unclip_ratio: f32,
    /// Minimum region size in map pixels
    pub min_region_pixels: usize,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            pixel_threshold: 0.3,
            box_threshold: 0.6,
            unclip_ratio: 1.5,
            min_region_pixels: 10,
        }
    }
}

/// PaddleOCR text detection model
///
/// Uses the PP-OCR detection model to find text regions in images.
/// Runs on CPU only.
#[derive(Clone)]
pub struct OcrDetectionModel {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Model output name
    output_name: String,
    /// Post-processing thresholds
    params: DetectionParams,
}

impl std::fmt::Debug for OcrDetectionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrDetectionModel")
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl OcrDetectionModel {
    /// Load the OCR detection model from a file
    ///
    /// # Arguments
    /// - `model_path`: Path to the ONNX model file (det_model.onnx)
    /// - `intra_threads`: ONNX Runtime intra-op threads
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    pub async fn new<P: AsRef<Path>>(model_path: P, intra_threads: usize) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("OCR detection model not found: {}", model_path.display());
        }

        info!("Loading OCR detection model from {}", model_path.display());

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
                "Failed to load OCR detection model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "x".to_string());

        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .unwrap_or_else(|| "sigmoid_0.tmp_0".to_string());

        debug!(
            "Detection model loaded - input: {}, output: {}",
            input_name, output_name
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            output_name,
            params: DetectionParams::default(),
        })
    }

    /// Override post-processing thresholds
    pub fn with_params(mut self, params: DetectionParams) -> Self {
        self.params = params;
        self
    }

    pub fn params(&self) -> DetectionParams {
        self.params
    }

    /// Run text detection on a preprocessed image tensor
    ///
    /// # Arguments
    /// - `input`: Preprocessed image tensor of shape [1, 3, H, W] (NCHW format)
    ///
    /// # Returns
    /// Boxes in preprocessed image space, ordered top-to-bottom then left-to-right
    pub fn detect(&self, input: &Array4<f32>) -> Result<Vec<TextBox>> {
        let shape = input.shape();
        if shape[0] != 1 || shape[1] != 3 {
            anyhow::bail!("Invalid input shape: {:?}, expected [1, 3, H, W]", shape);
        }
        let (input_height, input_width) = (shape[2], shape[3]);

        let input_value =
            Value::from_array(input.to_owned()).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Detection session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .context("Detection inference failed")?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        debug!("Detection output shape: {:?}", output_tensor.shape());

        // [1, 1, H, W] or [1, H, W] probability map
        let mut map = output_tensor.view();
        while map.ndim() > 2 {
            map = map.index_axis_move(Axis(0), 0);
        }
        let map = map
            .into_dimensionality::<Ix2>()
            .context("Unexpected detection output shape")?;

        let scale_y = input_height as f32 / map.nrows().max(1) as f32;
        let scale_x = input_width as f32 / map.ncols().max(1) as f32;

        let text_boxes = boxes_from_probability_map(map, &self.params, scale_x, scale_y);
        debug!("Detected {} text regions", text_boxes.len());

        Ok(text_boxes)
    }
}

/// Convert a DB probability map into text boxes
///
/// Pixels above `pixel_threshold` are grouped into 4-connected components;
/// components that are large and confident enough become boxes, scaled by
/// `scale_x`/`scale_y` into input space and unclipped.
pub fn boxes_from_probability_map(
    map: ArrayView2<f32>,
    params: &DetectionParams,
    scale_x: f32,
    scale_y: f32,
) -> Vec<TextBox> {
    let (height, width) = map.dim();
    let mut visited = vec![false; height * width];
    let mut text_boxes = Vec::new();

    for y in 0..height {
        for x in 0..width {
            if visited[y * width + x] || map[[y, x]] < params.pixel_threshold {
                continue;
            }

            let region = flood_fill(&map, &mut visited, x, y, params.pixel_threshold);
            if region.count < params.min_region_pixels {
                continue;
            }

            let confidence = region.sum / region.count as f32;
            if confidence < params.box_threshold {
                continue;
            }

            let text_box = TextBox {
                x: region.min_x as f32 * scale_x,
                y: region.min_y as f32 * scale_y,
                width: (region.max_x - region.min_x + 1) as f32 * scale_x,
                height: (region.max_y - region.min_y + 1) as f32 * scale_y,
                confidence,
            };
            text_boxes.push(text_box.unclip(params.unclip_ratio));
        }
    }

    sort_reading_order(&mut text_boxes);
    text_boxes
}

/// Order boxes top-to-bottom, then left-to-right within a line
fn sort_reading_order(boxes: &mut [TextBox]) {
    boxes.sort_by(|a, b| {
        a.y.partial_cmp(&b.y)
            .unwrap_or(Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
    });

    // Boxes on the same visual line may start a few pixels apart vertically
    for i in 0..boxes.len().saturating_sub(1) {
        for j in (0..=i).rev() {
            let (current, next) = (&boxes[j], &boxes[j + 1]);
            if (next.y - current.y).abs() < SAME_LINE_TOLERANCE && next.x < current.x {
                boxes.swap(j, j + 1);
            } else {
                break;
            }
        }
    }
}

struct Region {
    min_x: usize,
    max_x: usize,
    min_y: usize,
    max_y: usize,
    count: usize,
    sum: f32,
}

/// Iterative flood fill over pixels at or above `threshold`
fn flood_fill(
    map: &ArrayView2<f32>,
    visited: &mut [bool],
    start_x: usize,
    start_y: usize,
    threshold: f32,
) -> Region {
    let (height, width) = map.dim();
    let mut stack = vec![(start_x, start_y)];
    let mut region = Region {
        min_x: start_x,
        max_x: start_x,
        min_y: start_y,
        max_y: start_y,
        count: 0,
        sum: 0.0,
    };

    while let Some((x, y)) = stack.pop() {
        let index = y * width + x;
        if visited[index] {
            continue;
        }

        let prob = map[[y, x]];
        if prob < threshold {
            continue;
        }

        visited[index] = true;
        region.count += 1;
        region.sum += prob;
        region.min_x = region.min_x.min(x);
        region.max_x = region.max_x.max(x);
        region.min_y = region.min_y.min(y);
        region.max_y = region.max_y.max(y);

        if x > 0 {
            stack.push((x - 1, y));
        }
        if x + 1 < width {
            stack.push((x + 1, y));
        }
        if y > 0 {
            stack.push((x, y - 1));
        }
        if y + 1 < height {
            stack.push((x, y + 1));
        }
    }

    region
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-request OCR pipeline
//!
//! `Received -> Decoding -> Recognizing -> Assembling -> Responded`, with
//! `Failed` reachable from every non-terminal stage. A pipeline value lives
//! for exactly one request.

use std::fmt;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::response::OcrResponse;
use crate::api::errors::ApiError;
use crate::vision::ocr::{assemble_text, EngineError};
use crate::vision::{decode_image_bytes, DecodeError, VisionModelManager};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    Decoding,
    Recognizing,
    Assembling,
    Responded,
    Failed,
}

impl PipelineStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStage::Responded | PipelineStage::Failed)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Received => "received",
            PipelineStage::Decoding => "decoding",
            PipelineStage::Recognizing => "recognizing",
            PipelineStage::Assembling => "assembling",
            PipelineStage::Responded => "responded",
            PipelineStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("uploaded file is empty")]
    EmptyUpload,

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl From<PipelineError> for ApiError {
    fn from(error: PipelineError) -> Self {
        match error {
            PipelineError::EmptyUpload => ApiError::EmptyUpload,
            PipelineError::Decode(e) => ApiError::UnreadableImage(e.to_string()),
            PipelineError::Engine(EngineError::Timeout(_)) => ApiError::Timeout,
            PipelineError::Engine(EngineError::Unavailable(msg)) => {
                ApiError::ServiceUnavailable(msg)
            }
            PipelineError::Engine(e) => ApiError::EngineFailure(e.to_string()),
        }
    }
}

pub struct OcrPipeline<'a> {
    manager: &'a VisionModelManager,
    request_id: String,
    stage: PipelineStage,
}

impl<'a> OcrPipeline<'a> {
    pub fn new(manager: &'a VisionModelManager, request_id: impl Into<String>) -> Self {
        Self {
            manager,
            request_id: request_id.into(),
            stage: PipelineStage::Received,
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Drive one upload through every stage
    pub async fn run(&mut self, upload: &[u8]) -> Result<OcrResponse, PipelineError> {
        let start = Instant::now();
        let result = self.run_stages(upload).await;

        match &result {
            Ok(response) => info!(
                "[{}] OCR complete: {} chars in {}ms",
                self.request_id,
                response.text.len(),
                start.elapsed().as_millis()
            ),
            Err(e) => {
                let from = self.stage;
                self.advance(PipelineStage::Failed);
                warn!("[{}] OCR failed during {}: {}", self.request_id, from, e);
            }
        }

        result
    }

    async fn run_stages(&mut self, upload: &[u8]) -> Result<OcrResponse, PipelineError> {
        if upload.is_empty() {
            return Err(PipelineError::EmptyUpload);
        }

        self.advance(PipelineStage::Decoding);
        let (image, info) = decode_image_bytes(upload)?;
        debug!(
            "[{}] Decoded {}x{} {:?} ({} bytes)",
            self.request_id, info.width, info.height, info.format, info.size_bytes
        );

        self.advance(PipelineStage::Recognizing);
        let regions = self.manager.recognize(image).await?;
        debug!("[{}] Engine returned {} regions", self.request_id, regions.len());

        self.advance(PipelineStage::Assembling);
        let text = assemble_text(&regions);

        self.advance(PipelineStage::Responded);
        Ok(OcrResponse::new(text))
    }

    fn advance(&mut self, next: PipelineStage) {
        debug!("[{}] {} -> {}", self.request_id, self.stage, next);
        self.stage = next;
    }
}

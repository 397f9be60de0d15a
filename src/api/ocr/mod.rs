// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR API endpoint module
//!
//! Provides POST /ocr for extracting text from uploaded images.

pub mod handler;
pub mod pipeline;
pub mod request;
pub mod response;

pub use handler::ocr_handler;
pub use pipeline::{OcrPipeline, PipelineError, PipelineStage};
pub use request::{OcrUpload, UPLOAD_FIELD};
pub use response::OcrResponse;

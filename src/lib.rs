// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod version;
pub mod vision;

pub use api::{create_app, start_server, ApiError, AppState, OcrResponse};
pub use config::{ConfigError, ServerConfig};
pub use vision::ocr::{assemble_text, EngineError, RecognitionEngine, TextRegion};
pub use vision::{decode_image_bytes, DecodeError, PixelBuffer, VisionModelConfig, VisionModelManager};

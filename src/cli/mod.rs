// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::path::PathBuf;

use clap::Parser;

/// PaddleOCR upload server
///
/// Every option may also come from the environment or a TOML file passed via
/// `--config`. Flags and environment take precedence over the file.
#[derive(Parser, Debug, Default)]
#[command(name = "paddle-ocr-server")]
#[command(version = crate::version::VERSION)]
#[command(about = "HTTP service extracting text from uploaded images", long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, env = "OCR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "OCR_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "OCR_PORT")]
    pub port: Option<u16>,

    /// Directory holding det/cls models and per-language rec models
    #[arg(long, env = "OCR_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    /// Recognition language (en, ch, japan, korean, ...)
    #[arg(long, env = "OCR_LANGUAGE")]
    pub language: Option<String>,

    /// Detect and flip upside-down text lines
    #[arg(long, env = "OCR_USE_ANGLE_CLS", value_parser = clap::builder::BoolishValueParser::new())]
    pub use_angle_cls: Option<bool>,

    /// Largest accepted upload in bytes
    #[arg(long, env = "OCR_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: Option<usize>,

    /// Recognitions allowed to run at once
    #[arg(long, env = "OCR_MAX_CONCURRENT_RECOGNITIONS")]
    pub max_concurrent_recognitions: Option<usize>,

    /// Seconds a request may spend waiting for and running recognition
    #[arg(long, env = "OCR_RECOGNITION_TIMEOUT_SECS")]
    pub recognition_timeout_secs: Option<u64>,

    /// ONNX Runtime intra-op threads per model session
    #[arg(long, env = "OCR_INTRA_THREADS")]
    pub intra_threads: Option<usize>,
}

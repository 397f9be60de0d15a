// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Server configuration
//!
//! Built from defaults, then an optional TOML file, then flags and
//! environment variables. Validated once before anything is loaded.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::Cli;
use crate::vision::ocr::RecognitionOptions;
use crate::vision::VisionModelConfig;

/// Recognition languages shipped as PaddleOCR rec models
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "en", "ch", "chinese_cht", "japan", "korean", "latin", "arabic", "cyrillic",
    "devanagari", "ta", "te", "ka",
];

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

impl ConfigError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub model_dir: PathBuf,
    pub language: String,
    pub use_angle_cls: bool,
    pub max_upload_bytes: usize,
    pub max_concurrent_recognitions: usize,
    pub recognition_timeout_secs: u64,
    pub intra_threads: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            model_dir: PathBuf::from("./models/paddleocr-onnx"),
            language: "en".to_string(),
            use_angle_cls: true,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_concurrent_recognitions: 2,
            recognition_timeout_secs: 30,
            intra_threads: 4,
        }
    }
}

impl ServerConfig {
    /// Resolve the final configuration for this process
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay anything set through flags or environment
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(host) = &cli.host {
            self.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(model_dir) = &cli.model_dir {
            self.model_dir = model_dir.clone();
        }
        if let Some(language) = &cli.language {
            self.language = language.clone();
        }
        if let Some(use_angle_cls) = cli.use_angle_cls {
            self.use_angle_cls = use_angle_cls;
        }
        if let Some(max_upload_bytes) = cli.max_upload_bytes {
            self.max_upload_bytes = max_upload_bytes;
        }
        if let Some(max_concurrent) = cli.max_concurrent_recognitions {
            self.max_concurrent_recognitions = max_concurrent;
        }
        if let Some(timeout) = cli.recognition_timeout_secs {
            self.recognition_timeout_secs = timeout;
        }
        if let Some(intra_threads) = cli.intra_threads {
            self.intra_threads = intra_threads;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.host
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::invalid("host", format!("{}: {}", self.host, e)))?;

        if self.port == 0 {
            return Err(ConfigError::invalid("port", "must be non-zero"));
        }
        if self.language.trim().is_empty() {
            return Err(ConfigError::invalid("language", "must not be empty"));
        }
        if !SUPPORTED_LANGUAGES.contains(&self.language.as_str()) {
            return Err(ConfigError::invalid(
                "language",
                format!(
                    "'{}' is not supported (expected one of: {})",
                    self.language,
                    SUPPORTED_LANGUAGES.join(", ")
                ),
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::invalid("max_upload_bytes", "must be positive"));
        }
        if self.max_concurrent_recognitions == 0 {
            return Err(ConfigError::invalid(
                "max_concurrent_recognitions",
                "must be positive",
            ));
        }
        if self.recognition_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "recognition_timeout_secs",
                "must be positive",
            ));
        }
        if self.intra_threads == 0 {
            return Err(ConfigError::invalid("intra_threads", "must be positive"));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = self
            .host
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::invalid("host", format!("{}: {}", self.host, e)))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn recognition_timeout(&self) -> Duration {
        Duration::from_secs(self.recognition_timeout_secs)
    }

    pub fn vision_model_config(&self) -> VisionModelConfig {
        VisionModelConfig {
            ocr_model_dir: self.model_dir.clone(),
            options: RecognitionOptions {
                language: self.language.clone(),
                use_angle_cls: self.use_angle_cls,
            },
            intra_threads: self.intra_threads,
            max_concurrent_recognitions: self.max_concurrent_recognitions,
            recognition_timeout: self.recognition_timeout(),
        }
    }
}

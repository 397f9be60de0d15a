// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Parser;
use paddle_ocr_server::{
    api::{start_server, AppState},
    cli::Cli,
    config::ServerConfig,
    version,
    vision::VisionModelManager,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ServerConfig::load(&cli).context("Invalid server configuration")?;

    info!("🚀 Starting PaddleOCR server {}", version::get_version_string());
    info!(
        "🔧 Model dir: {}, language: {}, angle cls: {}",
        config.model_dir.display(),
        config.language,
        config.use_angle_cls
    );

    let manager = VisionModelManager::new(config.vision_model_config())
        .await
        .with_context(|| {
            format!(
                "Failed to load PaddleOCR models from {}",
                config.model_dir.display()
            )
        })?;

    info!(
        "✅ Recognition engine '{}' ready ({} concurrent, {:?} timeout)",
        manager.engine_name(),
        manager.max_concurrent(),
        manager.recognition_timeout()
    );

    let state = Arc::new(AppState::new(Arc::new(manager), config.max_upload_bytes));
    let addr = config.bind_addr()?;

    start_server(addr, state).await
}

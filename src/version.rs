// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the PaddleOCR server

/// Semantic version number
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version string shown at startup
pub fn get_version_string() -> String {
    format!("v{}", VERSION)
}

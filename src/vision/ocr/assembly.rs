// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Joins recognized regions into the response text

use super::engine::TextRegion;

/// Newline-join region texts in the order given
///
/// No trimming, deduplication or spatial sorting happens here: the engine's
/// order is the reading order. Multi-column layouts and rotated text may
/// therefore come out in an unexpected order.
pub fn assemble_text(regions: &[TextRegion]) -> String {
    regions
        .iter()
        .map(|region| region.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

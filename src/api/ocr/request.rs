// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Multipart upload extraction for the OCR endpoint

use axum::http::StatusCode;
use axum_extra::extract::multipart::{Multipart, MultipartError};
use bytes::Bytes;
use tracing::debug;

use crate::api::errors::ApiError;

/// Form field the image is expected in
pub const UPLOAD_FIELD: &str = "file";

/// A single uploaded file, read fully into memory
#[derive(Debug, Clone)]
pub struct OcrUpload {
    pub field_name: Option<String>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl OcrUpload {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Take the first field named `file`, or else the first field carrying a
    /// file name. Reading stops as soon as a `file` field is found.
    pub async fn from_multipart(
        mut multipart: Multipart,
        max_upload_bytes: usize,
    ) -> Result<Self, ApiError> {
        let mut fallback: Option<OcrUpload> = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(e, max_upload_bytes))?
        {
            let field_name = field.name().map(str::to_string);
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);

            let is_upload_field = field_name.as_deref() == Some(UPLOAD_FIELD);
            let is_fallback = fallback.is_none() && file_name.is_some();

            // Always consume the body so the stream can advance
            let bytes = field
                .bytes()
                .await
                .map_err(|e| multipart_error(e, max_upload_bytes))?;

            if !is_upload_field && !is_fallback {
                debug!("Ignoring multipart field {:?}", field_name);
                continue;
            }

            if bytes.len() > max_upload_bytes {
                return Err(ApiError::PayloadTooLarge {
                    limit: max_upload_bytes,
                });
            }

            let upload = OcrUpload {
                field_name,
                file_name,
                content_type,
                bytes,
            };

            if is_upload_field {
                return Ok(upload);
            }
            debug!("Holding {:?} until a '{}' field shows up", upload.field_name, UPLOAD_FIELD);
            fallback = Some(upload);
        }

        fallback.ok_or_else(|| ApiError::ValidationError {
            field: UPLOAD_FIELD.to_string(),
            message: format!("multipart field '{}' is required", UPLOAD_FIELD),
        })
    }
}

fn multipart_error(error: MultipartError, max_upload_bytes: usize) -> ApiError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge {
            limit: max_upload_bytes,
        }
    } else {
        ApiError::InvalidRequest(error.body_text())
    }
}

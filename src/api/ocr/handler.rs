// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR endpoint handler

use std::sync::Arc;

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::multipart::{Multipart, MultipartRejection};
use tracing::{debug, warn};
use uuid::Uuid;

use super::pipeline::OcrPipeline;
use super::request::OcrUpload;
use crate::api::errors::{ApiError, ApiErrorResponse, REQUEST_ID_HEADER};
use crate::api::http_server::AppState;

/// POST /ocr - Extract text from an uploaded image
///
/// # Request
/// `multipart/form-data` with the image in the `file` field (or the first
/// field that carries a file name).
///
/// # Response
/// `{"text": "..."}` with one line per recognized region, in engine order.
///
/// # Errors
/// - 400: empty upload, unreadable image, malformed multipart, missing field
/// - 413: upload over the configured size limit
/// - 500/503/504: recognition failed, unavailable, or timed out
pub async fn ocr_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let request_id = Uuid::new_v4().to_string();

    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            warn!("[{}] Rejected OCR request: {}", request_id, rejection.body_text());
            return ApiErrorResponse::new(
                ApiError::InvalidRequest(rejection.body_text()),
                Some(request_id),
            )
            .into_response();
        }
    };

    let upload = match OcrUpload::from_multipart(multipart, state.max_upload_bytes).await {
        Ok(upload) => upload,
        Err(error) => {
            warn!("[{}] Invalid OCR upload: {}", request_id, error);
            return ApiErrorResponse::new(error, Some(request_id)).into_response();
        }
    };

    debug!(
        "[{}] OCR upload received: field={:?} file={:?} type={:?} bytes={}",
        request_id,
        upload.field_name,
        upload.file_name,
        upload.content_type,
        upload.len()
    );

    let mut pipeline = OcrPipeline::new(&state.vision_model_manager, request_id.clone());
    match pipeline.run(&upload.bytes).await {
        Ok(response) => {
            debug!("[{}] Extracted text: {:?}", request_id, response.text);
            ([(REQUEST_ID_HEADER, request_id)], Json(response)).into_response()
        }
        Err(error) => ApiErrorResponse::new(ApiError::from(error), Some(request_id)).into_response(),
    }
}

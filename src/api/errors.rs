// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Header carrying the per-request identifier
pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error_type: String,
    pub message: String,
    pub request_id: Option<String>,
    pub details: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    InvalidRequest(String),
    ValidationError {
        field: String,
        message: String,
    },
    EmptyUpload,
    UnreadableImage(String),
    PayloadTooLarge {
        limit: usize,
    },
    EngineFailure(String),
    ServiceUnavailable(String),
    Timeout,
}

impl ApiError {
    pub fn to_response(&self, request_id: Option<String>) -> ErrorResponse {
        let (error_type, message, details) = match self {
            ApiError::InvalidRequest(msg) => ("invalid_request", msg.clone(), None),
            ApiError::ValidationError { field, message } => {
                let mut details = HashMap::new();
                details.insert(
                    "field".to_string(),
                    serde_json::Value::String(field.clone()),
                );
                ("validation_error", message.clone(), Some(details))
            }
            ApiError::EmptyUpload => (
                "empty_upload",
                "Uploaded file is empty".to_string(),
                None,
            ),
            ApiError::UnreadableImage(msg) => (
                "unreadable_image",
                format!("Uploaded file is not a readable image: {}", msg),
                None,
            ),
            ApiError::PayloadTooLarge { limit } => {
                let mut details = HashMap::new();
                details.insert(
                    "limit_bytes".to_string(),
                    serde_json::Value::Number((*limit as u64).into()),
                );
                (
                    "payload_too_large",
                    format!("Upload exceeds maximum size of {} bytes", limit),
                    Some(details),
                )
            }
            ApiError::EngineFailure(msg) => (
                "engine_error",
                format!("Text recognition failed: {}", msg),
                None,
            ),
            ApiError::ServiceUnavailable(msg) => ("service_unavailable", msg.clone(), None),
            ApiError::Timeout => (
                "timeout",
                "Text recognition timed out".to_string(),
                None,
            ),
        };

        ErrorResponse {
            error_type: error_type.to_string(),
            message,
            request_id,
            details,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidRequest(_)
            | ApiError::ValidationError { .. }
            | ApiError::EmptyUpload
            | ApiError::UnreadableImage(_) => 400,
            ApiError::PayloadTooLarge { .. } => 413,
            ApiError::EngineFailure(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
            ApiError::Timeout => 504,
        }
    }

    /// True when the caller sent something unusable (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::ValidationError { field, message } => {
                write!(f, "Validation error for {}: {}", field, message)
            }
            ApiError::EmptyUpload => write!(f, "Uploaded file is empty"),
            ApiError::UnreadableImage(msg) => write!(f, "Unreadable image: {}", msg),
            ApiError::PayloadTooLarge { limit } => {
                write!(f, "Payload exceeds {} bytes", limit)
            }
            ApiError::EngineFailure(msg) => write!(f, "Engine failure: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            ApiError::Timeout => write!(f, "Request timed out"),
        }
    }
}

impl std::error::Error for ApiError {}

/// Error response wrapper that carries the request id into the body and headers
pub struct ApiErrorResponse {
    pub error: ApiError,
    pub request_id: Option<String>,
}

impl ApiErrorResponse {
    pub fn new(error: ApiError, request_id: Option<String>) -> Self {
        Self { error, request_id }
    }
}

impl From<ApiError> for ApiErrorResponse {
    fn from(error: ApiError) -> Self {
        Self::new(error, None)
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = self.error.to_response(self.request_id.clone());

        match self.request_id {
            Some(request_id) => {
                (status, [(REQUEST_ID_HEADER, request_id)], Json(body)).into_response()
            }
            None => (status, Json(body)).into_response(),
        }
    }
}

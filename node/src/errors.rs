// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use echo_log::{LogError, QueueError};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Log store error: {0}")]
    Store(#[from] LogError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Store(err) => {
                tracing::error!("Log store operation failed: {}", err);
                match err {
                    LogError::Decode { line, .. } => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        format!("Stored line {} is not a valid entry", line),
                    ),
                    LogError::Queue(QueueError::Closed) => (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "Log store is shutting down".to_string(),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                    ),
                }
            }
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

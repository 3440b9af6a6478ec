//! Error responses.
//!
//! Every failure leaves the service as `{"error": <code>, "msg": <text>}`.
//! Persistence details stay in the server log; the client sees an opaque
//! `internal_error`.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::admission::Rejection;
use crate::store::StoreError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub msg: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("request denied: {0}")]
    Denied(Rejection),

    #[error("request body too large")]
    PayloadTooLarge,

    #[error("resource not found")]
    NotFound,

    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Denied(rejection) => rejection.status(),
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_failed",
            ApiError::Denied(rejection) => rejection.kind.code(),
            ApiError::PayloadTooLarge => "payload_too_large",
            ApiError::NotFound => "not_found",
            ApiError::Persistence(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            ApiError::Validation(msg) => msg.clone(),
            ApiError::Denied(rejection) => rejection.message.clone(),
            ApiError::PayloadTooLarge => "Request body too large".to_string(),
            ApiError::NotFound => "Resource not found".to_string(),
            ApiError::Persistence(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Persistence(err) = &self {
            tracing::error!(error = %err, "Store operation failed");
        }

        let status = self.status();
        let retry_after = match &self {
            ApiError::Denied(rejection) => rejection.retry_after_secs,
            _ => None,
        };
        let body = ErrorBody {
            error: self.code(),
            msg: self.client_message(),
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

// src/error.rs
//! Error taxonomy surfaced to callers. Every variant carries a stable
//! machine-readable code plus a human-readable message.

use axum::{
    extract::rejection::JsonRejection,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ColumnError {
    #[error("{message}")]
    Validation {
        message: String,
        field: Option<&'static str>,
    },

    #[error("{0}")]
    NewsSearch(String),

    #[error("{0}")]
    ContentGeneration(String),

    #[error("column generation was cancelled by the user")]
    UserCancelled,

    #[error("rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("request body is too large")]
    PayloadTooLarge,
}

pub type Result<T> = std::result::Result<T, ColumnError>;

impl ColumnError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field),
        }
    }

    pub fn generation(message: impl Into<String>) -> Self {
        Self::ContentGeneration(message.into())
    }

    /// Stable code for clients; never localized.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::NewsSearch(_) => "NEWS_SEARCH_ERROR",
            Self::ContentGeneration(_) => "CONTENT_GENERATION_ERROR",
            Self::UserCancelled => "USER_CANCELLED",
            Self::RateLimited { .. } => "RATE_LIMIT_EXCEEDED",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::UserCancelled => StatusCode::BAD_REQUEST,
            Self::NewsSearch(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::ContentGeneration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

/// Body extraction failures keep the JSON error contract instead of axum's
/// plain-text rejections.
impl From<JsonRejection> for ColumnError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::PayloadTooLarge;
        }
        Self::validation("body", rejection.body_text())
    }
}

/// JSON body for every error response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub error_code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
    pub processed_date: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, code: &'static str) -> Self {
        Self {
            success: false,
            error: error.into(),
            error_code: code,
            field: None,
            processed_date: crate::models::iso_now(),
        }
    }
}

impl IntoResponse for ColumnError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        } else {
            tracing::debug!(code = self.code(), error = %self, "request rejected");
        }

        let mut body = ErrorBody::new(self.to_string(), self.code());
        if let Self::Validation { field, .. } = &self {
            body.field = *field;
        }
        let mut resp = (status, Json(body)).into_response();
        if let Self::RateLimited { retry_after_secs } = self {
            if let Ok(v) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                resp.headers_mut().insert("retry-after", v);
            }
        }
        resp
    }
}

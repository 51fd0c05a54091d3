//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::RESOURCE_NOT_FOUND;
use crate::store::StoreError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("bad request: {message}")]
    BadRequest {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    /// Fixed client message; the source is logged but never serialized.
    #[error("{message}")]
    Internal {
        message: String,
        #[source]
        source: BoxError,
    },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest {
            message: message.into(),
            source: None,
        }
    }

    pub fn malformed<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        AppError::BadRequest {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn internal<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        AppError::Internal {
            message: message.into(),
            source: source.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest { .. } => "bad_request",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::NotFound(_) => "not_found",
            AppError::Internal { .. } => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            AppError::BadRequest { message, .. } => message.clone(),
            AppError::Unauthorized(message) => message.clone(),
            AppError::NotFound(message) => message.clone(),
            AppError::Internal { message, .. } => message.clone(),
        }
    }
}

impl AppError {
    /// Store failure with the handler's message; a missing or foreign reference becomes 404.
    pub fn store(message: impl Into<String>, err: StoreError) -> Self {
        match err {
            StoreError::NotFound(detail) => {
                tracing::debug!(%detail, "rejected reference");
                AppError::NotFound(RESOURCE_NOT_FOUND.into())
            }
            err => AppError::internal(message, err),
        }
    }
}

/// Store failures that reach a handler without a more specific message.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::store("Internal Server Error", err)
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Internal { message, source } => {
                tracing::error!(error = %source, "{}", message);
            }
            AppError::BadRequest {
                message,
                source: Some(source),
            } => {
                tracing::debug!(error = %source, "{}", message);
            }
            _ => {}
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.client_message(),
            },
        };
        (self.status(), Json(body)).into_response()
    }
}

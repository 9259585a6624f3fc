//! Error types shared by both services
//!
//! `ServiceError` covers process-level failures (configuration, telemetry,
//! sockets). `ApiError` is the HTTP-facing taxonomy: every variant maps to
//! exactly one status code and one message that is safe to show callers.

use axum::{
    Json,
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Startup and shutdown failures
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Telemetry pipeline errors
    #[error("Telemetry error: {message}")]
    Telemetry { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl ServiceError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new telemetry error
    pub fn telemetry<S: Into<String>>(message: S) -> Self {
        Self::Telemetry {
            message: message.into(),
        }
    }
}

/// Body of every non-200 JSON response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

/// Failures a handler reports to its caller
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    #[error("malformed request body")]
    InvalidInput,

    #[error("request body over the size limit")]
    PayloadTooLarge,

    #[error("postal code failed validation")]
    InvalidZipcode,

    #[error("postal code does not exist")]
    ZipcodeNotFound,

    #[error("location upstream unavailable")]
    CepServiceUnavailable,

    #[error("weather upstream unavailable")]
    WeatherServiceUnavailable,

    #[error("orchestrator unreachable")]
    OrchestratorUnavailable,

    #[error("unclassified internal failure")]
    Internal,
}

impl ApiError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::InvalidZipcode => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::ZipcodeNotFound => StatusCode::NOT_FOUND,
            ApiError::CepServiceUnavailable
            | ApiError::WeatherServiceUnavailable
            | ApiError::OrchestratorUnavailable => StatusCode::BAD_GATEWAY,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the response body. Never carries the internal cause.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            ApiError::InvalidInput => "invalid input format",
            ApiError::PayloadTooLarge => "request body too large",
            ApiError::InvalidZipcode => "invalid zipcode",
            ApiError::ZipcodeNotFound => "can not find zipcode",
            ApiError::CepServiceUnavailable => "cep service is unavailable, try again later",
            ApiError::WeatherServiceUnavailable => {
                "weather service is unavailable, try again later"
            }
            ApiError::OrchestratorUnavailable => {
                "orchestrator service is unavailable, try again later"
            }
            ApiError::Internal => "internal server error",
        }
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge
        } else {
            Self::InvalidInput
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            message: self.user_message().to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

//! Error responses for the HTTP API.
//!
//! Every failure leaves the server as `{error, message, details?}` with a
//! status code chosen by the error type, and is logged at a level matching
//! its [`ErrorSeverity`].
use baccarat_engine::errors::GameError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::Reply;

/// Body of every non-2xx API response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g. "nothing_to_undo")
    pub error: String,
    /// Human-readable error message
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn into_response(self, status: StatusCode) -> Response {
        reply::with_status(reply::json(&self), status).into_response()
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Bad input from the operator (4xx)
    Client,
    /// Unexpected failure inside the server (5xx)
    Server,
    /// Shared state can no longer be trusted, e.g. a poisoned lock
    Critical,
}

/// Conversion of domain errors into logged HTTP responses
pub trait IntoErrorResponse {
    fn status_code(&self) -> StatusCode;

    fn error_code(&self) -> &'static str;

    fn error_message(&self) -> String;

    fn error_details(&self) -> Option<serde_json::Value> {
        None
    }

    fn severity(&self) -> ErrorSeverity {
        if self.status_code().is_server_error() {
            ErrorSeverity::Server
        } else {
            ErrorSeverity::Client
        }
    }

    fn to_error_response(&self) -> ErrorResponse {
        if let Some(details) = self.error_details() {
            ErrorResponse::with_details(self.error_code(), self.error_message(), details)
        } else {
            ErrorResponse::new(self.error_code(), self.error_message())
        }
    }

    fn into_http_response(self) -> Response
    where
        Self: Sized,
    {
        let status = self.status_code();
        let severity = self.severity();
        let error_response = self.to_error_response();
        log_error(severity, status, &error_response);
        error_response.into_response(status)
    }
}

fn log_error(severity: ErrorSeverity, status: StatusCode, error: &ErrorResponse) {
    match severity {
        ErrorSeverity::Client => tracing::info!(
            status = status.as_u16(),
            code = %error.error,
            message = %error.message,
            "request rejected"
        ),
        ErrorSeverity::Server => tracing::error!(
            status = status.as_u16(),
            code = %error.error,
            message = %error.message,
            "request failed"
        ),
        ErrorSeverity::Critical => tracing::error!(
            status = status.as_u16(),
            code = %error.error,
            message = %error.message,
            critical = true,
            "request failed with corrupted state"
        ),
    }
}

impl IntoErrorResponse for GameError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_code(&self) -> &'static str {
        match self {
            GameError::InvalidCardValue { .. } => "invalid_card_value",
            GameError::EmptyHand { .. } => "empty_hand",
            GameError::InvalidOutcome(_) => "invalid_outcome",
            GameError::NothingToUndo => "nothing_to_undo",
            GameError::EmptyImport => "empty_import",
        }
    }

    fn error_message(&self) -> String {
        self.to_string()
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            GameError::InvalidCardValue { value } => Some(serde_json::json!({ "value": value })),
            GameError::EmptyHand { side } => Some(serde_json::json!({ "side": side })),
            GameError::InvalidOutcome(value) => Some(serde_json::json!({
                "value": value,
                "expected": ["BANKER", "PLAYER", "TIE"]
            })),
            _ => None,
        }
    }
}

/// Request bodies the API could not decode
#[derive(Debug, Clone, Error)]
pub enum RequestError {
    #[error("Malformed request body: {0}")]
    MalformedBody(String),
}

impl warp::reject::Reject for RequestError {}

impl IntoErrorResponse for RequestError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_code(&self) -> &'static str {
        "malformed_body"
    }

    fn error_message(&self) -> String {
        self.to_string()
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl IntoErrorResponse for ExportError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_code(&self) -> &'static str {
        "export_failed"
    }

    fn error_message(&self) -> String {
        self.to_string()
    }
}

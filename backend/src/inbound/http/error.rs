//! HTTP adapter mapping for domain errors.
//!
//! Domain errors stay transport agnostic; this module chooses the status code
//! and the `{"errors": ..., "code": ...}` body shape. Internal and storage
//! availability failures are logged in full and returned redacted.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;
use utoipa::ToSchema;

use crate::domain::{Error, ErrorCode};
use crate::middleware::TRACE_ID_HEADER;

/// Convenient result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, Error>;

/// JSON body returned for every failed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Human-readable description.
    #[schema(example = "insufficient funds")]
    pub errors: String,
    /// Stable machine-readable code.
    pub code: ErrorCode,
    /// Request correlation identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    /// Structured context such as the failing field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub details: Option<Value>,
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::InsufficientFunds => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::UnknownReceiver | ErrorCode::UnknownItem => StatusCode::NOT_FOUND,
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn redacted_message(code: ErrorCode) -> Option<&'static str> {
    match code {
        ErrorCode::InternalError => Some("Internal server error"),
        ErrorCode::ServiceUnavailable => Some("Service temporarily unavailable"),
        _ => None,
    }
}

fn body_for(error: &Error) -> ErrorResponse {
    if let Some(message) = redacted_message(error.code()) {
        return ErrorResponse {
            errors: message.to_owned(),
            code: error.code(),
            trace_id: error.trace_id().map(str::to_owned),
            details: None,
        };
    }
    ErrorResponse {
        errors: error.message().to_owned(),
        code: error.code(),
        trace_id: error.trace_id().map(str::to_owned),
        details: error.details().cloned(),
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        if matches!(
            self.code(),
            ErrorCode::InternalError | ErrorCode::ServiceUnavailable
        ) {
            error!(
                code = ?self.code(),
                message = self.message(),
                trace_id = self.trace_id(),
                "request failed"
            );
        }

        let mut builder = HttpResponse::build(self.status_code());
        if let Some(id) = self.trace_id() {
            builder.insert_header((TRACE_ID_HEADER, id.to_owned()));
        }
        builder.json(body_for(self))
    }
}

//! Error responses
//!
//! Every failure is rendered as `{"message", "error", "errors"?}`. Storage
//! failures are reported as a generic 500 so no database detail leaks.

use std::collections::BTreeMap;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tokio::task::JoinError;
use tracing::error;

use ledger_core::{Error, ErrorKind};

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub error: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

/// HTTP status for each error kind
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidAmount | ErrorKind::SameAccount | ErrorKind::Validation => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::AccountFrozen
        | ErrorKind::InsufficientFunds
        | ErrorKind::DuplicateIban
        | ErrorKind::DuplicateName
        | ErrorKind::AccountInUse
        | ErrorKind::ConcurrencyConflict => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    fn bad_request(message: String, errors: Option<BTreeMap<String, String>>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                message,
                error: ErrorKind::Validation,
                errors,
            },
        }
    }

    fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorBody {
                message: "Internal server error".to_string(),
                error: ErrorKind::Internal,
                errors: None,
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let kind = err.kind();
        if kind == ErrorKind::Internal {
            error!("request failed: {}", err);
            return Self::internal();
        }

        let errors = match &err {
            Error::Validation { field, message } => {
                Some(BTreeMap::from([(field.to_string(), message.clone())]))
            }
            Error::InvalidAmount(message) => {
                Some(BTreeMap::from([("amount".to_string(), message.clone())]))
            }
            _ => None,
        };

        Self {
            status: status_for(kind),
            body: ErrorBody {
                message: err.to_string(),
                error: kind,
                errors,
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text(), None)
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text(), None)
    }
}

impl From<JoinError> for ApiError {
    fn from(err: JoinError) -> Self {
        error!("blocking task failed: {}", err);
        Self::internal()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

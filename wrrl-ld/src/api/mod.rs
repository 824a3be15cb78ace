//! HTTP API handlers for wrrl-ld

pub mod auth;
pub mod buildinfo;
pub mod health;
pub mod journal;
pub mod licensing;
pub mod registry;
pub mod roles;
pub mod royalty;
pub mod sse;
pub mod usage;

pub use auth::auth_middleware;
pub use buildinfo::get_build_info;
pub use health::health_routes;
pub use sse::event_stream;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use wrrl_common::error::LedgerError;
use wrrl_common::events::LedgerEvent;

use crate::SubmitError;

/// Body returned by every accepted mutating request
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    /// Journal sequence number the command was applied at
    pub seq: u64,
    pub event: LedgerEvent,
}

/// API error: a domain rejection or a service-level failure
#[derive(Debug)]
pub enum ApiError {
    Ledger(LedgerError),
    Internal(String),
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Rejected(e) => ApiError::Ledger(e),
            SubmitError::Journal(e) => ApiError::Internal(format!("Journal append failed: {}", e)),
        }
    }
}

impl ApiError {
    fn not_found(what: impl std::fmt::Display) -> Self {
        ApiError::Ledger(LedgerError::NotFound(what.to_string()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self {
            ApiError::Ledger(err) => {
                let status = match err {
                    LedgerError::Authorization(_) => StatusCode::FORBIDDEN,
                    LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
                    LedgerError::AlreadyExists(_) => StatusCode::CONFLICT,
                    LedgerError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
                    LedgerError::StateConflict(_) => StatusCode::CONFLICT,
                    LedgerError::ExternalVerification(_) => StatusCode::UNPROCESSABLE_ENTITY,
                };
                (status, err.kind(), err.to_string())
            }
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal", msg.clone())
            }
        };

        let body = Json(json!({
            "error": message,
            "kind": kind,
        }));

        (status, body).into_response()
    }
}

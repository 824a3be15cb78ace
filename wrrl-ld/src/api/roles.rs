//! Role administration API
//!
//! Administrator set and capability grants. All mutations go through the
//! command journal like every other ledger operation.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wrrl_common::records::Capability;

use super::{ApiError, SubmitResponse};
use crate::ledger::LedgerCommand;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AdminRequest {
    pub caller: Uuid,
    pub identity: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CapabilityRequest {
    pub caller: Uuid,
    pub capability: Capability,
    pub identity: Uuid,
}

/// Role summary for one identity
#[derive(Debug, Serialize)]
pub struct RolesResponse {
    pub identity: Uuid,
    pub is_admin: bool,
    /// Explicit grants only; admin status implies every capability
    pub capabilities: Vec<Capability>,
}

/// POST /api/roles/admins
pub async fn add_admin(
    State(state): State<AppState>,
    Json(req): Json<AdminRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let (seq, event) = state
        .submit(req.caller, LedgerCommand::AddAdmin { identity: req.identity })
        .await?;
    Ok(Json(SubmitResponse { seq, event }))
}

/// DELETE /api/roles/admins
pub async fn remove_admin(
    State(state): State<AppState>,
    Json(req): Json<AdminRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let (seq, event) = state
        .submit(req.caller, LedgerCommand::RemoveAdmin { identity: req.identity })
        .await?;
    Ok(Json(SubmitResponse { seq, event }))
}

/// POST /api/roles/capabilities
pub async fn grant_capability(
    State(state): State<AppState>,
    Json(req): Json<CapabilityRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let (seq, event) = state
        .submit(
            req.caller,
            LedgerCommand::GrantCapability { capability: req.capability, identity: req.identity },
        )
        .await?;
    Ok(Json(SubmitResponse { seq, event }))
}

/// DELETE /api/roles/capabilities
pub async fn revoke_capability(
    State(state): State<AppState>,
    Json(req): Json<CapabilityRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let (seq, event) = state
        .submit(
            req.caller,
            LedgerCommand::RevokeCapability { capability: req.capability, identity: req.identity },
        )
        .await?;
    Ok(Json(SubmitResponse { seq, event }))
}

/// GET /api/roles/:identity
///
/// Always succeeds; an unknown identity simply has no roles.
pub async fn get_roles(
    State(state): State<AppState>,
    Path(identity): Path<Uuid>,
) -> Json<RolesResponse> {
    let ledger = state.ledger.read().await;
    let roles = ledger.roles();
    Json(RolesResponse {
        identity,
        is_admin: roles.is_admin(identity),
        capabilities: roles.capabilities_of(identity),
    })
}

//! Licensing API
//!
//! Template upserts, license issuance, and keyed lookups for both.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use wrrl_common::records::{IssuedLicense, LicenseTemplate};

use super::{ApiError, SubmitResponse};
use crate::ledger::LedgerCommand;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SetTemplateRequest {
    pub caller: Uuid,
    pub song_id: String,
    pub license_type: String,
    pub price: u64,
    pub duration_days: u32,
    pub terms: String,
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct IssueLicenseRequest {
    pub caller: Uuid,
    pub song_id: String,
    pub license_type: String,
    pub licensee: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct TemplateQuery {
    pub song_id: String,
    pub license_type: String,
}

#[derive(Debug, Deserialize)]
pub struct IssuedQuery {
    pub song_id: String,
    pub license_type: String,
    pub licensee: Uuid,
}

/// POST /api/licenses/templates
pub async fn set_template(
    State(state): State<AppState>,
    Json(req): Json<SetTemplateRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let (seq, event) = state
        .submit(
            req.caller,
            LedgerCommand::SetLicenseTemplate {
                song_id: req.song_id,
                license_type: req.license_type,
                price: req.price,
                duration_days: req.duration_days,
                terms: req.terms,
                active: req.active,
            },
        )
        .await?;
    Ok(Json(SubmitResponse { seq, event }))
}

/// POST /api/licenses/issue
pub async fn issue_license(
    State(state): State<AppState>,
    Json(req): Json<IssueLicenseRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let (seq, event) = state
        .submit(
            req.caller,
            LedgerCommand::IssueLicense {
                song_id: req.song_id,
                license_type: req.license_type,
                licensee: req.licensee,
            },
        )
        .await?;
    Ok(Json(SubmitResponse { seq, event }))
}

/// GET /api/licenses/templates?song_id=&license_type=
pub async fn get_template(
    State(state): State<AppState>,
    Query(query): Query<TemplateQuery>,
) -> Result<Json<LicenseTemplate>, ApiError> {
    let ledger = state.ledger.read().await;
    ledger
        .licensing()
        .license_template(&query.song_id, &query.license_type)
        .cloned()
        .map(Json)
        .ok_or_else(|| {
            ApiError::not_found(format!(
                "{} template for song {}",
                query.license_type, query.song_id
            ))
        })
}

/// GET /api/licenses/issued?song_id=&license_type=&licensee=
pub async fn get_issued_license(
    State(state): State<AppState>,
    Query(query): Query<IssuedQuery>,
) -> Result<Json<IssuedLicense>, ApiError> {
    let ledger = state.ledger.read().await;
    ledger
        .licensing()
        .issued_license(&query.song_id, &query.license_type, query.licensee)
        .cloned()
        .map(Json)
        .ok_or_else(|| {
            ApiError::not_found(format!(
                "{} license on song {} for {}",
                query.license_type, query.song_id, query.licensee
            ))
        })
}

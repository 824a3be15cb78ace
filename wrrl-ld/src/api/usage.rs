//! Usage oracle API
//!
//! Platform play reports in, keyed lookups out.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use wrrl_common::records::UsageRecord;

use super::{ApiError, SubmitResponse};
use crate::ledger::LedgerCommand;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RecordUsageRequest {
    pub caller: Uuid,
    pub song_id: String,
    pub platform_id: String,
    pub reporting_period: String,
    pub play_count: u64,
    pub revenue: u64,
    pub verified: bool,
}

#[derive(Debug, Deserialize)]
pub struct UsageQuery {
    pub song_id: String,
    pub platform_id: String,
    pub reporting_period: String,
}

/// POST /api/usage
pub async fn record_usage(
    State(state): State<AppState>,
    Json(req): Json<RecordUsageRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let (seq, event) = state
        .submit(
            req.caller,
            LedgerCommand::RecordUsage {
                song_id: req.song_id,
                platform_id: req.platform_id,
                reporting_period: req.reporting_period,
                play_count: req.play_count,
                revenue: req.revenue,
                verified: req.verified,
            },
        )
        .await?;
    Ok(Json(SubmitResponse { seq, event }))
}

/// GET /api/usage?song_id=&platform_id=&reporting_period=
pub async fn get_usage(
    State(state): State<AppState>,
    Query(query): Query<UsageQuery>,
) -> Result<Json<UsageRecord>, ApiError> {
    let ledger = state.ledger.read().await;
    ledger
        .usage()
        .usage(&query.song_id, &query.platform_id, &query.reporting_period)
        .cloned()
        .map(Json)
        .ok_or_else(|| {
            ApiError::not_found(format!(
                "usage for song {} on {} in {}",
                query.song_id, query.platform_id, query.reporting_period
            ))
        })
}

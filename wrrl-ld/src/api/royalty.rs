//! Royalty accounting API
//!
//! Payment lifecycle (create, allocate, settle), per-holder payouts and
//! reversals, cumulative holder totals, and the read-only allocation
//! preview.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wrrl_common::records::{
    AllocationLine, DistributionReversal, HolderTotals, PaymentDistribution, RoyaltyPayment,
};

use super::{ApiError, SubmitResponse};
use crate::ledger::LedgerCommand;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub caller: Uuid,
    pub payment_id: String,
    pub song_id: String,
    pub platform_id: String,
    pub reporting_period: String,
    pub total_amount: u64,
}

#[derive(Debug, Deserialize)]
pub struct AddDistributionRequest {
    pub caller: Uuid,
    pub holder: Uuid,
    pub amount: u64,
    pub percentage: u32,
    pub rights_type: String,
}

#[derive(Debug, Deserialize)]
pub struct ProcessPaymentRequest {
    pub caller: Uuid,
    pub settlement_ref: String,
}

#[derive(Debug, Deserialize)]
pub struct ProcessDistributionRequest {
    pub caller: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ReverseDistributionRequest {
    pub caller: Uuid,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    pub total_amount: u64,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub song_id: String,
    pub total_amount: u64,
    /// Allocation lines grouped by rights type, each group summing to
    /// `total_amount`
    pub allocations: BTreeMap<String, Vec<AllocationLine>>,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    #[serde(flatten)]
    pub payment: RoyaltyPayment,
    /// Sum of distribution amounts recorded so far
    pub allocated: u64,
}

#[derive(Debug, Serialize)]
pub struct DistributionResponse {
    #[serde(flatten)]
    pub distribution: PaymentDistribution,
    pub reversal: Option<DistributionReversal>,
}

/// POST /api/payments
pub async fn create_payment(
    State(state): State<AppState>,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let (seq, event) = state
        .submit(
            req.caller,
            LedgerCommand::CreateRoyaltyPayment {
                payment_id: req.payment_id,
                song_id: req.song_id,
                platform_id: req.platform_id,
                reporting_period: req.reporting_period,
                total_amount: req.total_amount,
            },
        )
        .await?;
    Ok(Json(SubmitResponse { seq, event }))
}

/// POST /api/payments/:payment_id/distributions
pub async fn add_distribution(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
    Json(req): Json<AddDistributionRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let (seq, event) = state
        .submit(
            req.caller,
            LedgerCommand::AddPaymentDistribution {
                payment_id,
                holder: req.holder,
                amount: req.amount,
                percentage: req.percentage,
                rights_type: req.rights_type,
            },
        )
        .await?;
    Ok(Json(SubmitResponse { seq, event }))
}

/// POST /api/payments/:payment_id/process
pub async fn process_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
    Json(req): Json<ProcessPaymentRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let (seq, event) = state
        .submit(
            req.caller,
            LedgerCommand::ProcessRoyaltyPayment {
                payment_id,
                settlement_ref: req.settlement_ref,
            },
        )
        .await?;
    Ok(Json(SubmitResponse { seq, event }))
}

/// POST /api/payments/:payment_id/distributions/:holder/process
pub async fn process_distribution(
    State(state): State<AppState>,
    Path((payment_id, holder)): Path<(String, Uuid)>,
    Json(req): Json<ProcessDistributionRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let (seq, event) = state
        .submit(req.caller, LedgerCommand::ProcessDistribution { payment_id, holder })
        .await?;
    Ok(Json(SubmitResponse { seq, event }))
}

/// POST /api/payments/:payment_id/distributions/:holder/reverse
pub async fn reverse_distribution(
    State(state): State<AppState>,
    Path((payment_id, holder)): Path<(String, Uuid)>,
    Json(req): Json<ReverseDistributionRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let (seq, event) = state
        .submit(
            req.caller,
            LedgerCommand::ReverseDistribution { payment_id, holder, reason: req.reason },
        )
        .await?;
    Ok(Json(SubmitResponse { seq, event }))
}

/// GET /api/songs/:song_id/royalty-preview?total_amount=
///
/// Pure calculation over current splits; nothing is journaled.
pub async fn royalty_preview(
    State(state): State<AppState>,
    Path(song_id): Path<String>,
    Query(query): Query<PreviewQuery>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let ledger = state.ledger.read().await;
    let allocations = ledger.royalty().calculate_royalty_distribution(
        ledger.registry(),
        &song_id,
        query.total_amount,
    )?;
    Ok(Json(PreviewResponse { song_id, total_amount: query.total_amount, allocations }))
}

/// GET /api/payments/:payment_id
pub async fn get_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let ledger = state.ledger.read().await;
    let payment = ledger
        .royalty()
        .payment(&payment_id)
        .cloned()
        .ok_or_else(|| ApiError::not_found(format!("payment {}", payment_id)))?;
    let allocated = ledger.royalty().allocated_amount(&payment_id);
    Ok(Json(PaymentResponse { payment, allocated }))
}

/// GET /api/payments/:payment_id/distributions/:holder
pub async fn get_distribution(
    State(state): State<AppState>,
    Path((payment_id, holder)): Path<(String, Uuid)>,
) -> Result<Json<DistributionResponse>, ApiError> {
    let ledger = state.ledger.read().await;
    let distribution = ledger
        .royalty()
        .distribution(&payment_id, holder)
        .cloned()
        .ok_or_else(|| {
            ApiError::not_found(format!("distribution to {} on payment {}", holder, payment_id))
        })?;
    let reversal = ledger.royalty().reversal(&payment_id, holder).cloned();
    Ok(Json(DistributionResponse { distribution, reversal }))
}

/// GET /api/holders/:holder/totals
///
/// Always succeeds; a holder with no payout history is all zeros.
pub async fn get_holder_totals(
    State(state): State<AppState>,
    Path(holder): Path<Uuid>,
) -> Json<HolderTotals> {
    let ledger = state.ledger.read().await;
    Json(ledger.royalty().holder_totals(holder))
}

//! Journal browsing API
//!
//! Read-only pages over the durable command history, accepted and
//! rejected commands alike.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::db::{self, JournalEntry};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct JournalQuery {
    /// Return entries with seq strictly greater than this
    #[serde(default)]
    pub after: u64,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    100
}

#[derive(Debug, Serialize)]
pub struct JournalBrowseResponse {
    pub entries: Vec<JournalEntry>,
    /// Head of the ledger; the caller has caught up once the last
    /// returned seq reaches this
    pub last_seq: u64,
}

/// GET /api/journal?after=&limit=
pub async fn browse_journal(
    State(state): State<AppState>,
    Query(query): Query<JournalQuery>,
) -> Result<Json<JournalBrowseResponse>, ApiError> {
    let limit = query.limit.clamp(1, state.journal_browse_max_limit);
    let entries = db::browse(&state.db, query.after, limit)
        .await
        .map_err(|e| ApiError::Internal(format!("Journal browse failed: {}", e)))?;
    let last_seq = state.ledger.read().await.last_seq();
    Ok(Json(JournalBrowseResponse { entries, last_seq }))
}

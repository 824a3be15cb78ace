//! Rights registry API
//!
//! Song registration and updates, rights splits, and version links.
//! Mutations carry the acting `caller` in the body and go through the
//! command journal; queries read the in-memory snapshot.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wrrl_common::records::{RightsSplit, Song, SongFields, SongStatus, SongVersion};

use super::{ApiError, SubmitResponse};
use crate::ledger::LedgerCommand;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterSongRequest {
    pub caller: Uuid,
    pub song_id: String,
    #[serde(flatten)]
    pub fields: SongFields,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSongRequest {
    pub caller: Uuid,
    #[serde(flatten)]
    pub fields: SongFields,
    pub status: SongStatus,
}

#[derive(Debug, Deserialize)]
pub struct AddRightsHolderRequest {
    pub caller: Uuid,
    pub holder: Uuid,
    pub percentage: u32,
    pub rights_type: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRightsHolderRequest {
    pub caller: Uuid,
    pub percentage: u32,
}

#[derive(Debug, Deserialize)]
pub struct RemoveRightsHolderRequest {
    pub caller: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct AddSongVersionRequest {
    pub caller: Uuid,
    pub version_id: String,
    pub version_type: String,
    #[serde(default)]
    pub parent_song_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RightsTotalQuery {
    pub rights_type: String,
}

#[derive(Debug, Serialize)]
pub struct RightsTotalResponse {
    pub song_id: String,
    pub rights_type: String,
    /// Registered ownership total in basis points, 0 when none
    pub total_percentage: u32,
}

#[derive(Debug, Deserialize)]
pub struct ArtistQuery {
    pub artist: String,
}

#[derive(Debug, Serialize)]
pub struct ArtistSongCountResponse {
    pub artist: String,
    pub count: u64,
}

/// POST /api/songs
pub async fn register_song(
    State(state): State<AppState>,
    Json(req): Json<RegisterSongRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let (seq, event) = state
        .submit(
            req.caller,
            LedgerCommand::RegisterSong { song_id: req.song_id, fields: req.fields },
        )
        .await?;
    Ok(Json(SubmitResponse { seq, event }))
}

/// PUT /api/songs/:song_id
pub async fn update_song(
    State(state): State<AppState>,
    Path(song_id): Path<String>,
    Json(req): Json<UpdateSongRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let (seq, event) = state
        .submit(
            req.caller,
            LedgerCommand::UpdateSong { song_id, fields: req.fields, status: req.status },
        )
        .await?;
    Ok(Json(SubmitResponse { seq, event }))
}

/// POST /api/songs/:song_id/rights
pub async fn add_rights_holder(
    State(state): State<AppState>,
    Path(song_id): Path<String>,
    Json(req): Json<AddRightsHolderRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let (seq, event) = state
        .submit(
            req.caller,
            LedgerCommand::AddRightsHolder {
                song_id,
                holder: req.holder,
                percentage: req.percentage,
                rights_type: req.rights_type,
            },
        )
        .await?;
    Ok(Json(SubmitResponse { seq, event }))
}

/// PUT /api/songs/:song_id/rights/:holder
pub async fn update_rights_holder(
    State(state): State<AppState>,
    Path((song_id, holder)): Path<(String, Uuid)>,
    Json(req): Json<UpdateRightsHolderRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let (seq, event) = state
        .submit(
            req.caller,
            LedgerCommand::UpdateRightsHolder { song_id, holder, percentage: req.percentage },
        )
        .await?;
    Ok(Json(SubmitResponse { seq, event }))
}

/// DELETE /api/songs/:song_id/rights/:holder
pub async fn remove_rights_holder(
    State(state): State<AppState>,
    Path((song_id, holder)): Path<(String, Uuid)>,
    Json(req): Json<RemoveRightsHolderRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let (seq, event) = state
        .submit(req.caller, LedgerCommand::RemoveRightsHolder { song_id, holder })
        .await?;
    Ok(Json(SubmitResponse { seq, event }))
}

/// POST /api/songs/:song_id/versions
pub async fn add_song_version(
    State(state): State<AppState>,
    Path(song_id): Path<String>,
    Json(req): Json<AddSongVersionRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let (seq, event) = state
        .submit(
            req.caller,
            LedgerCommand::AddSongVersion {
                song_id,
                version_id: req.version_id,
                version_type: req.version_type,
                parent_song_id: req.parent_song_id,
            },
        )
        .await?;
    Ok(Json(SubmitResponse { seq, event }))
}

/// GET /api/songs/:song_id
pub async fn get_song(
    State(state): State<AppState>,
    Path(song_id): Path<String>,
) -> Result<Json<Song>, ApiError> {
    let ledger = state.ledger.read().await;
    ledger
        .registry()
        .song(&song_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("song {}", song_id)))
}

/// GET /api/songs/:song_id/rights/:holder
pub async fn get_rights_split(
    State(state): State<AppState>,
    Path((song_id, holder)): Path<(String, Uuid)>,
) -> Result<Json<RightsSplit>, ApiError> {
    let ledger = state.ledger.read().await;
    ledger
        .registry()
        .rights_split(&song_id, holder)
        .cloned()
        .map(Json)
        .ok_or_else(|| {
            ApiError::not_found(format!("rights split for {} on song {}", holder, song_id))
        })
}

/// GET /api/songs/:song_id/rights-total?rights_type=
///
/// Always succeeds; a song or rights type with no splits totals 0.
pub async fn get_rights_total(
    State(state): State<AppState>,
    Path(song_id): Path<String>,
    Query(query): Query<RightsTotalQuery>,
) -> Json<RightsTotalResponse> {
    let ledger = state.ledger.read().await;
    let total_percentage = ledger
        .registry()
        .total_rights_percentage(&song_id, &query.rights_type);
    Json(RightsTotalResponse { song_id, rights_type: query.rights_type, total_percentage })
}

/// GET /api/songs/:song_id/versions/:version_id
pub async fn get_song_version(
    State(state): State<AppState>,
    Path((song_id, version_id)): Path<(String, String)>,
) -> Result<Json<SongVersion>, ApiError> {
    let ledger = state.ledger.read().await;
    ledger
        .registry()
        .song_version(&song_id, &version_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("version {} of song {}", version_id, song_id)))
}

/// GET /api/artists/song-count?artist=
///
/// Always succeeds; an unknown artist has registered 0 songs.
pub async fn get_artist_song_count(
    State(state): State<AppState>,
    Query(query): Query<ArtistQuery>,
) -> Json<ArtistSongCountResponse> {
    let ledger = state.ledger.read().await;
    let count = ledger.registry().artist_song_count(&query.artist);
    Json(ArtistSongCountResponse { artist: query.artist, count })
}

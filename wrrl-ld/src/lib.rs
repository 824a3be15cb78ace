//! wrrl-ld library - Rights & Royalty Ledger daemon
//!
//! Couples the pure ledger state machine (`ledger::Ledger`) to a durable
//! SQLite command journal and an axum HTTP surface. All mutation flows
//! through [`AppState::submit`]; queries read the in-memory state behind
//! the same lock.

use std::sync::Arc;

use axum::Router;
use chrono::Utc;
use sqlx::SqlitePool;
use tokio::sync::{broadcast, RwLock};
use tracing::warn;
use uuid::Uuid;

use wrrl_common::error::LedgerError;
use wrrl_common::events::LedgerEvent;

pub mod api;
pub mod db;
pub mod ledger;

use ledger::{CommandEnvelope, Ledger, LedgerCommand};

/// A submission that did not produce an event
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The command was journaled but the ledger rejected it
    #[error("{0}")]
    Rejected(#[from] LedgerError),

    /// The command could not be made durable and was not applied
    #[error("Journal append failed: {0}")]
    Journal(#[source] anyhow::Error),
}

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (command journal + settings)
    pub db: SqlitePool,

    /// In-memory ledger behind the single writer lock. Write order through
    /// this lock is the ledger's total order.
    pub ledger: Arc<RwLock<Ledger>>,

    /// Event broadcaster for SSE subscribers
    pub event_tx: broadcast::Sender<LedgerEvent>,

    /// Shared secret for API authentication (0 disables auth)
    pub shared_secret: i64,

    /// Request body cap for authenticated routes, from settings
    pub max_body_bytes: usize,

    /// Page size cap for journal browsing, from settings
    pub journal_browse_max_limit: u32,
}

impl AppState {
    /// Create new application state around a replayed ledger
    pub fn new(
        db: SqlitePool,
        ledger: Ledger,
        shared_secret: i64,
        max_body_bytes: usize,
        journal_browse_max_limit: u32,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(100); // Buffer up to 100 events
        Self {
            db,
            ledger: Arc::new(RwLock::new(ledger)),
            event_tx,
            shared_secret,
            max_body_bytes,
            journal_browse_max_limit,
        }
    }

    /// Subscribe to the ledger event stream for SSE
    pub fn subscribe_events(&self) -> broadcast::Receiver<LedgerEvent> {
        self.event_tx.subscribe()
    }

    /// Submit one command: journal it durably, apply it, publish the event.
    ///
    /// The writer lock is held across append and apply, so journal order is
    /// apply order. The envelope is durable before `apply` runs; a crash
    /// between the two replays the command at the next startup instead of
    /// losing it. Rejected commands stay journaled (with the rejection
    /// backfilled onto the row) and reject identically on replay.
    pub async fn submit(
        &self,
        caller: Uuid,
        command: LedgerCommand,
    ) -> Result<(u64, LedgerEvent), SubmitError> {
        let mut ledger = self.ledger.write().await;

        let envelope = CommandEnvelope {
            seq: ledger.next_seq(),
            caller,
            submitted_at: Utc::now(),
            command,
        };
        db::append_command(&self.db, &envelope)
            .await
            .map_err(SubmitError::Journal)?;

        let outcome = ledger.apply(&envelope);

        // Audit backfill only; replay never reads it
        let rejection = outcome.as_ref().err().map(|e| e.to_string());
        if let Err(e) = db::record_outcome(&self.db, envelope.seq, rejection.as_deref()).await {
            warn!("Failed to record outcome for journal seq {}: {}", envelope.seq, e);
        }

        let event = outcome?;
        // Ignore send errors (no receivers is OK)
        let _ = self.event_tx.send(event.clone());
        Ok((envelope.seq, event))
    }
}

/// Build application router
///
/// Mutating routes require authentication; query routes (including /health
/// and the SSE feed) do not.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post, put};

    // Protected routes (mutations; require authentication)
    let protected = Router::new()
        .route("/api/roles/admins", post(api::roles::add_admin).delete(api::roles::remove_admin))
        .route(
            "/api/roles/capabilities",
            post(api::roles::grant_capability).delete(api::roles::revoke_capability),
        )
        .route("/api/songs", post(api::registry::register_song))
        .route("/api/songs/:song_id", put(api::registry::update_song))
        .route("/api/songs/:song_id/rights", post(api::registry::add_rights_holder))
        .route(
            "/api/songs/:song_id/rights/:holder",
            put(api::registry::update_rights_holder).delete(api::registry::remove_rights_holder),
        )
        .route("/api/songs/:song_id/versions", post(api::registry::add_song_version))
        .route("/api/payments", post(api::royalty::create_payment))
        .route(
            "/api/payments/:payment_id/distributions",
            post(api::royalty::add_distribution),
        )
        .route("/api/payments/:payment_id/process", post(api::royalty::process_payment))
        .route(
            "/api/payments/:payment_id/distributions/:holder/process",
            post(api::royalty::process_distribution),
        )
        .route(
            "/api/payments/:payment_id/distributions/:holder/reverse",
            post(api::royalty::reverse_distribution),
        )
        .route("/api/usage", post(api::usage::record_usage))
        .route("/api/licenses/templates", post(api::licensing::set_template))
        .route("/api/licenses/issue", post(api::licensing::issue_license))
        .layer(middleware::from_fn_with_state(state.clone(), api::auth_middleware));

    // Public routes (queries and monitoring; no authentication)
    let public = Router::new()
        .route("/api/buildinfo", get(api::get_build_info))
        .route("/api/events", get(api::event_stream))
        .route("/api/journal", get(api::journal::browse_journal))
        .route("/api/songs/:song_id", get(api::registry::get_song))
        .route("/api/songs/:song_id/rights/:holder", get(api::registry::get_rights_split))
        .route("/api/songs/:song_id/rights-total", get(api::registry::get_rights_total))
        .route(
            "/api/songs/:song_id/versions/:version_id",
            get(api::registry::get_song_version),
        )
        .route("/api/songs/:song_id/royalty-preview", get(api::royalty::royalty_preview))
        .route("/api/artists/song-count", get(api::registry::get_artist_song_count))
        .route("/api/payments/:payment_id", get(api::royalty::get_payment))
        .route(
            "/api/payments/:payment_id/distributions/:holder",
            get(api::royalty::get_distribution),
        )
        .route("/api/holders/:holder/totals", get(api::royalty::get_holder_totals))
        .route("/api/usage", get(api::usage::get_usage))
        .route("/api/licenses/templates", get(api::licensing::get_template))
        .route("/api/licenses/issued", get(api::licensing::get_issued_license))
        .route("/api/roles/:identity", get(api::roles::get_roles))
        .merge(api::health_routes());

    // Combine routers
    Router::new()
        .merge(protected)
        .merge(public)
        .with_state(state)
}

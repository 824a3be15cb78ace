//! Journal durability and startup replay
//!
//! Drives commands through `AppState::submit` against a real SQLite file
//! and checks the journal-first contract: every submission is durable
//! before it applies, rejections are part of the recorded history, and a
//! restart (fresh pool, fresh ledger, replayed journal) reproduces the
//! exact same state and continues the sequence where it left off.

use std::path::Path;

use uuid::Uuid;

use wrrl_common::db::init_database;
use wrrl_common::error::LedgerError;
use wrrl_common::records::{Capability, PaymentStatus, SongFields};
use wrrl_ld::db;
use wrrl_ld::ledger::{Ledger, LedgerCommand};
use wrrl_ld::{AppState, SubmitError};

/// Open the service state the way main() does: init the database, load the
/// journal, replay it into a fresh ledger
async fn open_state(db_path: &Path, bootstrap_admin: Uuid) -> AppState {
    let pool = init_database(db_path).await.expect("Failed to initialize database");
    let history = db::load_all(&pool).await.expect("Failed to load journal");
    let mut ledger = Ledger::new(bootstrap_admin);
    ledger.replay(&history);
    AppState::new(pool, ledger, 0, 1_048_576, 500)
}

fn fields() -> SongFields {
    SongFields {
        title: "Title".to_string(),
        artist: "Artist".to_string(),
        composer: String::new(),
        publisher: String::new(),
        release_date: 20240101,
        isrc: String::new(),
    }
}

fn register(song_id: &str) -> LedgerCommand {
    LedgerCommand::RegisterSong { song_id: song_id.to_string(), fields: fields() }
}

fn add_split(song_id: &str, holder: Uuid, percentage: u32) -> LedgerCommand {
    LedgerCommand::AddRightsHolder {
        song_id: song_id.to_string(),
        holder,
        percentage,
        rights_type: "performance".to_string(),
    }
}

fn record_usage(song_id: &str) -> LedgerCommand {
    LedgerCommand::RecordUsage {
        song_id: song_id.to_string(),
        platform_id: "spotify".to_string(),
        reporting_period: "2024-Q1".to_string(),
        play_count: 1000,
        revenue: 1000,
        verified: true,
    }
}

fn create_payment(payment_id: &str, song_id: &str, total_amount: u64) -> LedgerCommand {
    LedgerCommand::CreateRoyaltyPayment {
        payment_id: payment_id.to_string(),
        song_id: song_id.to_string(),
        platform_id: "spotify".to_string(),
        reporting_period: "2024-Q1".to_string(),
        total_amount,
    }
}

// =============================================================================
// Durability of submissions
// =============================================================================

#[tokio::test]
async fn test_submit_journals_and_applies() {
    let dir = tempfile::tempdir().unwrap();
    let boot = Uuid::new_v4();
    let state = open_state(&dir.path().join("wrrl.db"), boot).await;

    let (seq, _) = state.submit(boot, register("SONG-1")).await.unwrap();
    assert_eq!(seq, 1);
    let (seq, _) = state.submit(boot, record_usage("SONG-1")).await.unwrap();
    assert_eq!(seq, 2);

    // Both rows are on disk, in order, with accepted outcomes backfilled
    let history = db::load_all(&state.db).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].seq, 1);
    assert_eq!(history[0].caller, boot);
    assert_eq!(history[0].command.op_name(), "RegisterSong");
    assert_eq!(history[1].command.op_name(), "RecordUsage");

    let entries = db::browse(&state.db, 0, 100).await.unwrap();
    assert!(entries.iter().all(|e| e.accepted == Some(true) && e.error.is_none()));

    // And the in-memory ledger applied them
    let ledger = state.ledger.read().await;
    assert!(ledger.registry().song("SONG-1").is_some());
    assert!(ledger.usage().usage("SONG-1", "spotify", "2024-Q1").is_some());
    assert_eq!(ledger.last_seq(), 2);
}

#[tokio::test]
async fn test_rejection_is_journaled_with_its_error() {
    let dir = tempfile::tempdir().unwrap();
    let boot = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let state = open_state(&dir.path().join("wrrl.db"), boot).await;

    let err = state.submit(stranger, register("SONG-1")).await.unwrap_err();
    match err {
        SubmitError::Rejected(LedgerError::Authorization(_)) => {}
        other => panic!("wrong error: {:?}", other),
    }

    // The rejected command is a journal row like any other, outcome and all
    let entries = db::browse(&state.db, 0, 100).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].seq, 1);
    assert_eq!(entries[0].op, "RegisterSong");
    assert_eq!(entries[0].accepted, Some(false));
    assert!(entries[0].error.as_deref().unwrap().starts_with("Not authorized"));

    // It consumed seq 1; the next submission takes seq 2
    assert!(state.ledger.read().await.registry().song("SONG-1").is_none());
    let (seq, _) = state.submit(boot, register("SONG-1")).await.unwrap();
    assert_eq!(seq, 2);
}

// =============================================================================
// Restart replay
// =============================================================================

#[tokio::test]
async fn test_restart_replays_history_including_rejections() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("wrrl.db");
    let boot = Uuid::new_v4();
    let artist = Uuid::new_v4();
    let (h1, h2) = (Uuid::new_v4(), Uuid::new_v4());

    // First process lifetime
    {
        let state = open_state(&db_path, boot).await;
        state
            .submit(boot, LedgerCommand::GrantCapability {
                capability: Capability::VerifiedArtist,
                identity: artist,
            })
            .await
            .unwrap();
        state.submit(artist, register("SONG-1")).await.unwrap();
        state.submit(artist, add_split("SONG-1", h1, 6000)).await.unwrap();
        // Journaled rejection: 6000 + 5000 would pass full ownership
        state.submit(artist, add_split("SONG-1", h2, 5000)).await.unwrap_err();
        state.submit(artist, add_split("SONG-1", h2, 4000)).await.unwrap();
        state.submit(boot, record_usage("SONG-1")).await.unwrap();
        state.submit(boot, create_payment("PAY-1", "SONG-1", 1000)).await.unwrap();
        state.db.close().await;
    }

    // Second process lifetime: fresh pool, fresh ledger, replayed journal
    let state = open_state(&db_path, boot).await;
    {
        let ledger = state.ledger.read().await;
        assert_eq!(ledger.last_seq(), 7);
        assert_eq!(
            ledger.registry().total_rights_percentage("SONG-1", "performance"),
            10_000
        );
        // The rejected 5000 left no trace; the retried 4000 is there
        assert_eq!(ledger.registry().rights_split("SONG-1", h2).unwrap().percentage, 4000);
        assert_eq!(ledger.royalty().payment("PAY-1").unwrap().status, PaymentStatus::Pending);
    }

    // Numbering continues where the first lifetime left off
    let (seq, _) = state
        .submit(boot, LedgerCommand::ProcessRoyaltyPayment {
            payment_id: "PAY-1".to_string(),
            settlement_ref: "d".repeat(64),
        })
        .await
        .unwrap();
    assert_eq!(seq, 8);
    assert_eq!(db::load_all(&state.db).await.unwrap().len(), 8);
    assert_eq!(
        state.ledger.read().await.royalty().payment("PAY-1").unwrap().status,
        PaymentStatus::Completed
    );
}

#[tokio::test]
async fn test_replayed_ledger_matches_live_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let boot = Uuid::new_v4();
    let holder = Uuid::new_v4();
    let state = open_state(&dir.path().join("wrrl.db"), boot).await;

    // A full payment lifecycle plus a few rejections along the way
    state.submit(boot, register("SONG-1")).await.unwrap();
    state.submit(boot, register("SONG-1")).await.unwrap_err();
    state.submit(boot, add_split("SONG-1", holder, 10_000)).await.unwrap();
    state.submit(boot, record_usage("SONG-1")).await.unwrap();
    state.submit(boot, create_payment("PAY-1", "SONG-1", 750)).await.unwrap();
    state
        .submit(boot, LedgerCommand::AddPaymentDistribution {
            payment_id: "PAY-1".to_string(),
            holder,
            amount: 750,
            percentage: 10_000,
            rights_type: "performance".to_string(),
        })
        .await
        .unwrap();
    state
        .submit(boot, LedgerCommand::ProcessDistribution {
            payment_id: "PAY-1".to_string(),
            holder,
        })
        .await
        .unwrap();
    state
        .submit(boot, LedgerCommand::ProcessDistribution {
            payment_id: "PAY-1".to_string(),
            holder,
        })
        .await
        .unwrap_err();

    // Replay the journal into a fresh ledger twice; both must agree with
    // each other and with the live ledger, rejection counts included
    let history = db::load_all(&state.db).await.unwrap();
    let mut first = Ledger::new(boot);
    let counts_first = first.replay(&history);
    let mut second = Ledger::new(boot);
    let counts_second = second.replay(&history);
    assert_eq!(counts_first, (6, 2));
    assert_eq!(counts_second, counts_first);

    let live = state.ledger.read().await;
    assert_eq!(first.last_seq(), live.last_seq());
    assert_eq!(first.registry().song("SONG-1"), live.registry().song("SONG-1"));
    assert_eq!(
        first.registry().rights_split("SONG-1", holder),
        live.registry().rights_split("SONG-1", holder)
    );
    assert_eq!(first.royalty().payment("PAY-1"), live.royalty().payment("PAY-1"));
    assert_eq!(
        first.royalty().distribution("PAY-1", holder),
        live.royalty().distribution("PAY-1", holder)
    );
    assert_eq!(first.royalty().holder_totals(holder), live.royalty().holder_totals(holder));
    assert_eq!(first.royalty().holder_totals(holder).total_paid, 750);
    assert_eq!(second.last_seq(), first.last_seq());
}

//! Command journal persistence
//!
//! Every submitted command is INSERTed before it is applied, so the journal
//! is the authoritative history: accepted and rejected commands alike, in
//! sequence order. The apply outcome is backfilled afterwards as a
//! convenience for browsing; replay ignores it and re-derives every outcome
//! from the envelopes themselves.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::ledger::CommandEnvelope;

/// One journal row as served by the browse API
#[derive(Debug, Clone, Serialize)]
pub struct JournalEntry {
    pub seq: u64,
    pub submitted_at: DateTime<Utc>,
    pub caller: Uuid,
    pub op: String,
    pub command: serde_json::Value,
    /// None while the outcome backfill has not landed
    pub accepted: Option<bool>,
    pub error: Option<String>,
}

/// Durably append an envelope. Must succeed before the command is applied.
pub async fn append_command(pool: &SqlitePool, env: &CommandEnvelope) -> Result<()> {
    let command = serde_json::to_string(&env.command)?;
    sqlx::query(
        r#"
        INSERT INTO journal (seq, submitted_at, caller, command)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(env.seq as i64)
    .bind(env.submitted_at.to_rfc3339())
    .bind(env.caller.to_string())
    .bind(command)
    .execute(pool)
    .await?;

    Ok(())
}

/// Backfill the apply outcome onto an appended row
pub async fn record_outcome(pool: &SqlitePool, seq: u64, error: Option<&str>) -> Result<()> {
    sqlx::query("UPDATE journal SET accepted = ?, error = ? WHERE seq = ?")
        .bind(error.is_none())
        .bind(error)
        .bind(seq as i64)
        .execute(pool)
        .await?;

    Ok(())
}

/// Load the complete history in sequence order for startup replay
pub async fn load_all(pool: &SqlitePool) -> Result<Vec<CommandEnvelope>> {
    let rows = sqlx::query(
        "SELECT seq, submitted_at, caller, command FROM journal ORDER BY seq ASC",
    )
    .fetch_all(pool)
    .await?;

    let mut envelopes = Vec::with_capacity(rows.len());
    for row in rows {
        let seq: i64 = row.get("seq");
        let submitted_at: String = row.get("submitted_at");
        let caller: String = row.get("caller");
        let command: String = row.get("command");

        envelopes.push(CommandEnvelope {
            seq: seq as u64,
            submitted_at: DateTime::parse_from_rfc3339(&submitted_at)?.with_timezone(&Utc),
            caller: Uuid::parse_str(&caller)?,
            command: serde_json::from_str(&command)?,
        });
    }
    Ok(envelopes)
}

/// Page through the journal: rows with seq > `after`, up to `limit`
pub async fn browse(pool: &SqlitePool, after: u64, limit: u32) -> Result<Vec<JournalEntry>> {
    // seq is stored as i64; a cursor past that range can match nothing
    let after = i64::try_from(after).unwrap_or(i64::MAX);
    let rows = sqlx::query(
        r#"
        SELECT seq, submitted_at, caller, command, accepted, error
        FROM journal
        WHERE seq > ?
        ORDER BY seq ASC
        LIMIT ?
        "#,
    )
    .bind(after)
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        let seq: i64 = row.get("seq");
        let submitted_at: String = row.get("submitted_at");
        let caller: String = row.get("caller");
        let raw_command: String = row.get("command");
        let accepted: Option<bool> = row.get("accepted");
        let error: Option<String> = row.get("error");

        let command: serde_json::Value = serde_json::from_str(&raw_command)?;
        let op = command
            .get("op")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();

        entries.push(JournalEntry {
            seq: seq as u64,
            submitted_at: DateTime::parse_from_rfc3339(&submitted_at)?.with_timezone(&Utc),
            caller: Uuid::parse_str(&caller)?,
            op,
            command,
            accepted,
            error,
        });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerCommand;
    use wrrl_common::db::init_database;

    async fn test_pool() -> (SqlitePool, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let pool = init_database(&dir.path().join("wrrl.db"))
            .await
            .expect("Failed to initialize database");
        (pool, dir)
    }

    fn envelope(seq: u64) -> CommandEnvelope {
        CommandEnvelope {
            seq,
            caller: Uuid::new_v4(),
            submitted_at: Utc::now(),
            command: LedgerCommand::RecordUsage {
                song_id: "SONG-1".to_string(),
                platform_id: "spotify".to_string(),
                reporting_period: "2024-Q1".to_string(),
                play_count: seq * 10,
                revenue: seq * 100,
                verified: true,
            },
        }
    }

    #[tokio::test]
    async fn test_append_and_load_roundtrip() {
        let (pool, _dir) = test_pool().await;

        let envs: Vec<CommandEnvelope> = (1..=3).map(envelope).collect();
        for env in &envs {
            append_command(&pool, env).await.unwrap();
        }

        let loaded = load_all(&pool).await.unwrap();
        assert_eq!(loaded.len(), 3);
        for (original, loaded) in envs.iter().zip(&loaded) {
            assert_eq!(loaded.seq, original.seq);
            assert_eq!(loaded.caller, original.caller);
            assert_eq!(loaded.command.op_name(), "RecordUsage");
        }
    }

    #[tokio::test]
    async fn test_duplicate_seq_rejected_by_schema() {
        let (pool, _dir) = test_pool().await;
        append_command(&pool, &envelope(1)).await.unwrap();
        assert!(append_command(&pool, &envelope(1)).await.is_err());
    }

    #[tokio::test]
    async fn test_outcome_backfill_and_browse() {
        let (pool, _dir) = test_pool().await;
        for seq in 1..=5 {
            append_command(&pool, &envelope(seq)).await.unwrap();
        }
        record_outcome(&pool, 1, None).await.unwrap();
        record_outcome(&pool, 2, Some("State conflict: payment PAY-1 is already completed"))
            .await
            .unwrap();

        let entries = browse(&pool, 0, 500).await.unwrap();
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0].accepted, Some(true));
        assert_eq!(entries[0].error, None);
        assert_eq!(entries[1].accepted, Some(false));
        assert!(entries[1].error.as_deref().unwrap().starts_with("State conflict"));
        // No outcome recorded yet
        assert_eq!(entries[2].accepted, None);
        assert_eq!(entries[0].op, "RecordUsage");
        assert_eq!(entries[0].command["platform_id"], "spotify");
    }

    #[tokio::test]
    async fn test_browse_pagination() {
        let (pool, _dir) = test_pool().await;
        for seq in 1..=10 {
            append_command(&pool, &envelope(seq)).await.unwrap();
        }

        let page = browse(&pool, 0, 4).await.unwrap();
        assert_eq!(page.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![1, 2, 3, 4]);

        let page = browse(&pool, 4, 4).await.unwrap();
        assert_eq!(page.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![5, 6, 7, 8]);

        let page = browse(&pool, 8, 4).await.unwrap();
        assert_eq!(page.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![9, 10]);

        let page = browse(&pool, 10, 4).await.unwrap();
        assert!(page.is_empty());

        // A cursor beyond i64 range matches nothing, not the journal head
        let page = browse(&pool, u64::MAX, 4).await.unwrap();
        assert!(page.is_empty());
    }
}

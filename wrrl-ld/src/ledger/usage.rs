//! Usage oracle: platform play reports keyed by (song, platform, period)
//!
//! Usage records arrive from reporting feeds and may precede song
//! registration, so no song-existence check here. A later report for the
//! same key overwrites the earlier one; the royalty engine only trusts
//! records whose `verified` flag is set.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

use wrrl_common::error::{LedgerError, LedgerResult};
use wrrl_common::records::{validate_id, validate_text, Capability, UsageRecord, MAX_PERIOD_LEN};

use super::roles::RoleStore;

#[derive(Debug, Clone, Default)]
pub struct UsageStore {
    /// (song_id, platform_id, reporting_period) -> latest report
    records: BTreeMap<(String, String, String), UsageRecord>,
}

impl UsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or overwrite) a platform usage report
    #[allow(clippy::too_many_arguments)]
    pub fn record_usage(
        &mut self,
        roles: &RoleStore,
        caller: Uuid,
        now: DateTime<Utc>,
        song_id: &str,
        platform_id: &str,
        reporting_period: &str,
        play_count: u64,
        revenue: u64,
        verified: bool,
    ) -> LedgerResult<()> {
        roles.require_capability(Capability::UsageReporter, caller)?;
        validate_id("song_id", song_id)?;
        validate_id("platform_id", platform_id)?;
        validate_text("reporting_period", reporting_period, MAX_PERIOD_LEN)?;
        if reporting_period.is_empty() {
            return Err(LedgerError::InvalidParameter(
                "reporting_period must not be empty".to_string(),
            ));
        }

        self.records.insert(
            (song_id.to_string(), platform_id.to_string(), reporting_period.to_string()),
            UsageRecord {
                song_id: song_id.to_string(),
                platform_id: platform_id.to_string(),
                reporting_period: reporting_period.to_string(),
                play_count,
                revenue,
                verified,
                reported_by: caller,
                reported_at: now,
            },
        );
        Ok(())
    }

    pub fn usage(&self, song_id: &str, platform_id: &str, reporting_period: &str) -> Option<&UsageRecord> {
        self.records.get(&(
            song_id.to_string(),
            platform_id.to_string(),
            reporting_period.to_string(),
        ))
    }
}

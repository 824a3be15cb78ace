//! Rights registry: songs, ownership splits, versions
//!
//! Owns all song records, the per-(song, rights type) ownership totals
//! index, song versions, and the informational per-artist registration
//! counters. The ownership invariant enforced here: for any song and rights
//! type, the registered splits never sum past 10000 basis points.
//!
//! Every operation validates before mutating, so a rejected call leaves the
//! registry byte-for-byte unchanged.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

use wrrl_common::error::{LedgerError, LedgerResult};
use wrrl_common::records::{
    validate_id, validate_percentage, validate_text, validate_type_tag, Capability, RightsSplit,
    Song, SongFields, SongStatus, SongVersion, FULL_OWNERSHIP_BP, MAX_ISRC_LEN, MAX_TEXT_LEN,
};

use super::roles::RoleStore;

/// Songs, rights splits, and the maintained ownership totals index
#[derive(Debug, Clone, Default)]
pub struct RightsRegistry {
    songs: BTreeMap<String, Song>,

    /// (song_id, holder) -> split; one rights type per holder per song
    splits: BTreeMap<(String, Uuid), RightsSplit>,

    /// (song_id, rights_type) -> sum of split percentages, kept in lockstep
    /// with `splits`; entries are dropped when they reach zero
    rights_totals: BTreeMap<(String, String), u32>,

    /// (song_id, version_id) -> version
    versions: BTreeMap<(String, String), SongVersion>,

    /// Informational: registrations per exact artist string
    artist_song_counts: BTreeMap<String, u64>,
}

impl RightsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Register a new song. Requires the verified-artist capability.
    pub fn register_song(
        &mut self,
        roles: &RoleStore,
        caller: Uuid,
        seq: u64,
        song_id: &str,
        fields: &SongFields,
    ) -> LedgerResult<()> {
        roles.require_capability(Capability::VerifiedArtist, caller)?;
        if self.songs.contains_key(song_id) {
            return Err(LedgerError::AlreadyExists(format!("song {}", song_id)));
        }
        validate_id("song_id", song_id)?;
        validate_song_fields(fields)?;

        self.songs.insert(
            song_id.to_string(),
            Song {
                song_id: song_id.to_string(),
                title: fields.title.clone(),
                artist: fields.artist.clone(),
                composer: fields.composer.clone(),
                publisher: fields.publisher.clone(),
                release_date: fields.release_date,
                isrc: fields.isrc.clone(),
                registered_by: caller,
                registered_seq: seq,
                status: SongStatus::Active,
            },
        );
        *self.artist_song_counts.entry(fields.artist.clone()).or_insert(0) += 1;
        Ok(())
    }

    /// Replace a song's fields and status wholesale. The registrant and
    /// registration sequence are carried forward untouched.
    pub fn update_song(
        &mut self,
        roles: &RoleStore,
        caller: Uuid,
        song_id: &str,
        fields: &SongFields,
        status: SongStatus,
    ) -> LedgerResult<()> {
        let (registered_by, registered_seq) = {
            let song = self
                .songs
                .get(song_id)
                .ok_or_else(|| LedgerError::NotFound(format!("song {}", song_id)))?;
            (song.registered_by, song.registered_seq)
        };
        self.require_admin_or_registrant(roles, caller, registered_by, song_id)?;
        validate_song_fields(fields)?;

        self.songs.insert(
            song_id.to_string(),
            Song {
                song_id: song_id.to_string(),
                title: fields.title.clone(),
                artist: fields.artist.clone(),
                composer: fields.composer.clone(),
                publisher: fields.publisher.clone(),
                release_date: fields.release_date,
                isrc: fields.isrc.clone(),
                registered_by,
                registered_seq,
                status,
            },
        );
        Ok(())
    }

    /// Add a rights split for a holder, maintaining the ownership totals
    /// index. Fails if the (song, rights type) total would exceed 100%.
    pub fn add_rights_holder(
        &mut self,
        roles: &RoleStore,
        caller: Uuid,
        now: DateTime<Utc>,
        song_id: &str,
        holder: Uuid,
        percentage: u32,
        rights_type: &str,
    ) -> LedgerResult<()> {
        let registered_by = self.registrant_of(song_id)?;
        self.require_admin_or_registrant(roles, caller, registered_by, song_id)?;

        let key = (song_id.to_string(), holder);
        if self.splits.contains_key(&key) {
            return Err(LedgerError::AlreadyExists(format!(
                "rights split for {} on song {}",
                holder, song_id
            )));
        }
        validate_percentage(percentage)?;
        validate_type_tag("rights_type", rights_type)?;

        let total_key = (song_id.to_string(), rights_type.to_string());
        let current = self.rights_totals.get(&total_key).copied().unwrap_or(0);
        if current + percentage > FULL_OWNERSHIP_BP {
            return Err(LedgerError::InvalidParameter(format!(
                "total {} ownership of song {} would reach {} basis points (max {})",
                rights_type,
                song_id,
                current + percentage,
                FULL_OWNERSHIP_BP
            )));
        }

        self.splits.insert(
            key,
            RightsSplit {
                song_id: song_id.to_string(),
                holder,
                percentage,
                rights_type: rights_type.to_string(),
                added_at: now,
                updated_at: now,
            },
        );
        if percentage > 0 || current > 0 {
            self.rights_totals.insert(total_key, current + percentage);
        }
        Ok(())
    }

    /// Change a holder's percentage. The rights type is fixed by the
    /// existing split; the would-be type total must stay within 100%.
    pub fn update_rights_holder(
        &mut self,
        roles: &RoleStore,
        caller: Uuid,
        now: DateTime<Utc>,
        song_id: &str,
        holder: Uuid,
        new_percentage: u32,
    ) -> LedgerResult<()> {
        let key = (song_id.to_string(), holder);
        let (old_percentage, rights_type) = {
            let split = self.splits.get(&key).ok_or_else(|| {
                LedgerError::NotFound(format!("rights split for {} on song {}", holder, song_id))
            })?;
            (split.percentage, split.rights_type.clone())
        };
        let registered_by = self.registrant_of(song_id)?;
        self.require_admin_or_registrant(roles, caller, registered_by, song_id)?;
        validate_percentage(new_percentage)?;

        let total_key = (song_id.to_string(), rights_type);
        let current = self.rights_totals.get(&total_key).copied().unwrap_or(0);
        let would_be = current - old_percentage + new_percentage;
        if would_be > FULL_OWNERSHIP_BP {
            return Err(LedgerError::InvalidParameter(format!(
                "total {} ownership of song {} would reach {} basis points (max {})",
                total_key.1, song_id, would_be, FULL_OWNERSHIP_BP
            )));
        }

        if would_be > 0 {
            self.rights_totals.insert(total_key, would_be);
        } else {
            self.rights_totals.remove(&total_key);
        }
        let split = self.splits.get_mut(&key).ok_or_else(|| {
            LedgerError::NotFound(format!("rights split for {} on song {}", holder, song_id))
        })?;
        split.percentage = new_percentage;
        split.updated_at = now;
        Ok(())
    }

    /// Remove a holder's split and release its share of the type total
    pub fn remove_rights_holder(
        &mut self,
        roles: &RoleStore,
        caller: Uuid,
        song_id: &str,
        holder: Uuid,
    ) -> LedgerResult<()> {
        let key = (song_id.to_string(), holder);
        if !self.splits.contains_key(&key) {
            return Err(LedgerError::NotFound(format!(
                "rights split for {} on song {}",
                holder, song_id
            )));
        }
        let registered_by = self.registrant_of(song_id)?;
        self.require_admin_or_registrant(roles, caller, registered_by, song_id)?;

        // Checks done; now mutate
        let split = match self.splits.remove(&key) {
            Some(split) => split,
            None => return Err(LedgerError::NotFound(format!("rights split on {}", song_id))),
        };
        let total_key = (song_id.to_string(), split.rights_type);
        let current = self.rights_totals.get(&total_key).copied().unwrap_or(0);
        let remaining = current.saturating_sub(split.percentage);
        if remaining > 0 {
            self.rights_totals.insert(total_key, remaining);
        } else {
            self.rights_totals.remove(&total_key);
        }
        Ok(())
    }

    /// Record a song version. The version id must be new for the song; a
    /// parent, when given, must exist and differ from the song itself.
    pub fn add_song_version(
        &mut self,
        roles: &RoleStore,
        caller: Uuid,
        now: DateTime<Utc>,
        song_id: &str,
        version_id: &str,
        version_type: &str,
        parent_song_id: Option<&str>,
    ) -> LedgerResult<()> {
        let registered_by = self.registrant_of(song_id)?;
        self.require_admin_or_registrant(roles, caller, registered_by, song_id)?;
        validate_id("version_id", version_id)?;
        validate_type_tag("version_type", version_type)?;

        let key = (song_id.to_string(), version_id.to_string());
        if self.versions.contains_key(&key) {
            return Err(LedgerError::AlreadyExists(format!(
                "version {} of song {}",
                version_id, song_id
            )));
        }
        if let Some(parent) = parent_song_id {
            if parent == song_id {
                return Err(LedgerError::InvalidParameter(
                    "a version cannot derive from its own song".to_string(),
                ));
            }
            if !self.songs.contains_key(parent) {
                return Err(LedgerError::NotFound(format!("parent song {}", parent)));
            }
        }

        self.versions.insert(
            key,
            SongVersion {
                song_id: song_id.to_string(),
                version_id: version_id.to_string(),
                version_type: version_type.to_string(),
                parent_song_id: parent_song_id.map(str::to_string),
                added_at: now,
            },
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn song(&self, song_id: &str) -> Option<&Song> {
        self.songs.get(song_id)
    }

    pub fn rights_split(&self, song_id: &str, holder: Uuid) -> Option<&RightsSplit> {
        self.splits.get(&(song_id.to_string(), holder))
    }

    /// All splits of a song, in ascending holder order
    pub fn splits_for_song(&self, song_id: &str) -> Vec<&RightsSplit> {
        self.splits
            .range((song_id.to_string(), Uuid::nil())..)
            .take_while(|((sid, _), _)| sid == song_id)
            .map(|(_, split)| split)
            .collect()
    }

    pub fn song_version(&self, song_id: &str, version_id: &str) -> Option<&SongVersion> {
        self.versions.get(&(song_id.to_string(), version_id.to_string()))
    }

    /// Registered ownership total for a (song, rights type), 0 when none
    pub fn total_rights_percentage(&self, song_id: &str, rights_type: &str) -> u32 {
        self.rights_totals
            .get(&(song_id.to_string(), rights_type.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// False for unknown songs (no error)
    pub fn is_song_active(&self, song_id: &str) -> bool {
        self.songs
            .get(song_id)
            .map(|song| song.status == SongStatus::Active)
            .unwrap_or(false)
    }

    /// Number of songs registered under the exact artist string, 0 default
    pub fn artist_song_count(&self, artist: &str) -> u64 {
        self.artist_song_counts.get(artist).copied().unwrap_or(0)
    }

    // ------------------------------------------------------------------
    // Internal helpers
    // ------------------------------------------------------------------

    fn registrant_of(&self, song_id: &str) -> LedgerResult<Uuid> {
        self.songs
            .get(song_id)
            .map(|song| song.registered_by)
            .ok_or_else(|| LedgerError::NotFound(format!("song {}", song_id)))
    }

    fn require_admin_or_registrant(
        &self,
        roles: &RoleStore,
        caller: Uuid,
        registered_by: Uuid,
        song_id: &str,
    ) -> LedgerResult<()> {
        if roles.is_admin(caller) || caller == registered_by {
            return Ok(());
        }
        Err(LedgerError::Authorization(format!(
            "caller {} may not modify song {}",
            caller, song_id
        )))
    }
}

fn validate_song_fields(fields: &SongFields) -> LedgerResult<()> {
    if fields.title.is_empty() {
        return Err(LedgerError::InvalidParameter("title must not be empty".to_string()));
    }
    if fields.artist.is_empty() {
        return Err(LedgerError::InvalidParameter("artist must not be empty".to_string()));
    }
    validate_text("title", &fields.title, MAX_TEXT_LEN)?;
    validate_text("artist", &fields.artist, MAX_TEXT_LEN)?;
    validate_text("composer", &fields.composer, MAX_TEXT_LEN)?;
    validate_text("publisher", &fields.publisher, MAX_TEXT_LEN)?;
    validate_text("isrc", &fields.isrc, MAX_ISRC_LEN)?;
    Ok(())
}

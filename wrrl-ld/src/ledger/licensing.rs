//! License catalog: per-song license templates and issued licenses
//!
//! Templates are upserts keyed by (song, license type); issuance stamps an
//! immutable license record with the template's price at issue time and an
//! expiry derived from its duration. Issuing requires both an active
//! template and an active song.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

use wrrl_common::error::{LedgerError, LedgerResult};
use wrrl_common::records::{
    validate_text, validate_type_tag, Capability, IssuedLicense, LicenseTemplate, MAX_TEXT_LEN,
};

use super::registry::RightsRegistry;
use super::roles::RoleStore;

#[derive(Debug, Clone, Default)]
pub struct LicenseCatalog {
    /// (song_id, license_type) -> template
    templates: BTreeMap<(String, String), LicenseTemplate>,

    /// (song_id, license_type, licensee) -> issued license
    issued: BTreeMap<(String, String, Uuid), IssuedLicense>,
}

impl LicenseCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a license template for a song
    #[allow(clippy::too_many_arguments)]
    pub fn set_license_template(
        &mut self,
        roles: &RoleStore,
        registry: &RightsRegistry,
        caller: Uuid,
        song_id: &str,
        license_type: &str,
        price: u64,
        duration_days: u32,
        terms: &str,
        active: bool,
    ) -> LedgerResult<()> {
        roles.require_capability(Capability::LicenseManager, caller)?;
        if registry.song(song_id).is_none() {
            return Err(LedgerError::NotFound(format!("song {}", song_id)));
        }
        validate_type_tag("license_type", license_type)?;
        validate_text("terms", terms, MAX_TEXT_LEN)?;
        if duration_days == 0 {
            return Err(LedgerError::InvalidParameter(
                "duration_days must be at least 1".to_string(),
            ));
        }

        self.templates.insert(
            (song_id.to_string(), license_type.to_string()),
            LicenseTemplate {
                song_id: song_id.to_string(),
                license_type: license_type.to_string(),
                price,
                duration_days,
                terms: terms.to_string(),
                active,
            },
        );
        Ok(())
    }

    /// Issue a license to a licensee from an active template. The recorded
    /// price and expiry are fixed at issue time; later template edits do
    /// not touch already-issued licenses.
    pub fn issue_license(
        &mut self,
        roles: &RoleStore,
        registry: &RightsRegistry,
        caller: Uuid,
        now: DateTime<Utc>,
        song_id: &str,
        license_type: &str,
        licensee: Uuid,
    ) -> LedgerResult<()> {
        roles.require_capability(Capability::LicenseManager, caller)?;
        let template = self
            .templates
            .get(&(song_id.to_string(), license_type.to_string()))
            .ok_or_else(|| {
                LedgerError::NotFound(format!("{} template for song {}", license_type, song_id))
            })?;
        if !template.active {
            return Err(LedgerError::StateConflict(format!(
                "{} template for song {} is inactive",
                license_type, song_id
            )));
        }
        if !registry.is_song_active(song_id) {
            return Err(LedgerError::StateConflict(format!(
                "song {} is not active",
                song_id
            )));
        }
        let key = (song_id.to_string(), license_type.to_string(), licensee);
        if self.issued.contains_key(&key) {
            return Err(LedgerError::AlreadyExists(format!(
                "{} license on song {} for {}",
                license_type, song_id, licensee
            )));
        }

        let license = IssuedLicense {
            song_id: song_id.to_string(),
            license_type: license_type.to_string(),
            licensee,
            price_paid: template.price,
            issued_at: now,
            expires_at: now + Duration::days(template.duration_days as i64),
        };
        self.issued.insert(key, license);
        Ok(())
    }

    pub fn license_template(&self, song_id: &str, license_type: &str) -> Option<&LicenseTemplate> {
        self.templates.get(&(song_id.to_string(), license_type.to_string()))
    }

    pub fn issued_license(
        &self,
        song_id: &str,
        license_type: &str,
        licensee: Uuid,
    ) -> Option<&IssuedLicense> {
        self.issued
            .get(&(song_id.to_string(), license_type.to_string(), licensee))
    }
}

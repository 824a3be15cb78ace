//! Ledger record types
//!
//! Plain data carried by the ledger state machine and its API. All monetary
//! amounts are integer minor currency units (e.g. cents); all ownership
//! percentages are basis points (1/100th of a percent, 10000 = 100%).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};

/// Full ownership of one rights type, in basis points
pub const FULL_OWNERSHIP_BP: u32 = 10_000;

/// Maximum length of caller-supplied identifiers (song, payment, platform, version)
pub const MAX_ID_LEN: usize = 64;

/// Maximum length of rights-type and license-type tags
pub const MAX_TYPE_LEN: usize = 32;

/// Maximum length of free-text fields (title, artist, terms, ...)
pub const MAX_TEXT_LEN: usize = 256;

/// Maximum length of a reporting-period tag (e.g. "2025-Q2")
pub const MAX_PERIOD_LEN: usize = 32;

/// Maximum length of an ISRC code
pub const MAX_ISRC_LEN: usize = 16;

// ============================================================================
// Roles
// ============================================================================

/// Delegable capability kinds
///
/// Administrators hold every capability implicitly; these are the grants a
/// non-admin identity can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// May register songs and administer their rights splits
    VerifiedArtist,
    /// May create, allocate, and settle royalty payments
    PaymentProcessor,
    /// May record verified usage data for the oracle
    UsageReporter,
    /// May maintain license templates and issue licenses
    LicenseManager,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::VerifiedArtist => write!(f, "verified_artist"),
            Capability::PaymentProcessor => write!(f, "payment_processor"),
            Capability::UsageReporter => write!(f, "usage_reporter"),
            Capability::LicenseManager => write!(f, "license_manager"),
        }
    }
}

// ============================================================================
// Rights registry
// ============================================================================

/// Song lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SongStatus {
    Active,
    Inactive,
    Disputed,
}

impl std::fmt::Display for SongStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SongStatus::Active => write!(f, "active"),
            SongStatus::Inactive => write!(f, "inactive"),
            SongStatus::Disputed => write!(f, "disputed"),
        }
    }
}

/// A registered musical work
///
/// Created once by a verified artist; mutable only by an administrator or
/// the original registrant; never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub song_id: String,
    pub title: String,
    pub artist: String,
    pub composer: String,
    pub publisher: String,
    /// Caller-supplied integer date, stored opaquely
    pub release_date: i64,
    pub isrc: String,
    pub registered_by: Uuid,
    /// Journal sequence number of the registering command (monotonic)
    pub registered_seq: u64,
    pub status: SongStatus,
}

/// Editable song fields, replaced wholesale by an update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongFields {
    pub title: String,
    pub artist: String,
    pub composer: String,
    pub publisher: String,
    pub release_date: i64,
    pub isrc: String,
}

/// One holder's ownership share of one song
///
/// Keyed by (song_id, holder). A holder carries exactly one rights type per
/// song; shares of the same rights type on a song may not exceed
/// [`FULL_OWNERSHIP_BP`] in total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RightsSplit {
    pub song_id: String,
    pub holder: Uuid,
    /// Ownership share in basis points
    pub percentage: u32,
    pub rights_type: String,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A derivative or alternate version of a song (remix, cover, live, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongVersion {
    pub song_id: String,
    pub version_id: String,
    pub version_type: String,
    /// Originating song, when this version derives from another work
    pub parent_song_id: Option<String>,
    pub added_at: DateTime<Utc>,
}

// ============================================================================
// Royalty engine
// ============================================================================

/// Royalty payment lifecycle status (one-way: pending -> completed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A usage-backed royalty payment for one song / platform / period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoyaltyPayment {
    pub payment_id: String,
    pub song_id: String,
    pub platform_id: String,
    pub reporting_period: String,
    /// Fixed at creation; distributions may never allocate beyond it
    pub total_amount: u64,
    pub created_at: DateTime<Utc>,
    pub status: PaymentStatus,
    /// Opaque settlement reference (64 hex chars), set on completion
    pub settlement_ref: Option<String>,
}

/// Distribution lifecycle status (one-way: pending -> paid)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionStatus {
    Pending,
    Paid,
}

impl std::fmt::Display for DistributionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistributionStatus::Pending => write!(f, "pending"),
            DistributionStatus::Paid => write!(f, "paid"),
        }
    }
}

/// One holder's share of one payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDistribution {
    pub payment_id: String,
    pub holder: Uuid,
    pub amount: u64,
    /// Ownership share this distribution was computed from, in basis points
    pub percentage: u32,
    pub rights_type: String,
    pub status: DistributionStatus,
    pub paid_at: Option<DateTime<Utc>>,
}

/// Compensating record for a disputed or erroneous paid distribution
///
/// The distribution itself stays `paid` and gross holder totals are
/// preserved; the reversal carries the offset for auditing and netting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionReversal {
    pub payment_id: String,
    pub holder: Uuid,
    pub amount: u64,
    pub reason: String,
    pub reversed_at: DateTime<Utc>,
}

/// Running payout totals per rights holder
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderTotals {
    /// Gross sum of this holder's paid distributions
    pub total_paid: u64,
    /// Sum of reversal records against this holder's distributions
    pub total_reversed: u64,
    pub last_payment_at: Option<DateTime<Utc>>,
}

/// One line of a computed royalty allocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationLine {
    pub holder: Uuid,
    pub percentage: u32,
    pub amount: u64,
}

// ============================================================================
// Usage oracle
// ============================================================================

/// Verified usage data for one song / platform / period, as reported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub song_id: String,
    pub platform_id: String,
    pub reporting_period: String,
    pub play_count: u64,
    /// Platform-reported revenue in minor currency units
    pub revenue: u64,
    /// Whether the reporter attests this record passed verification
    pub verified: bool,
    pub reported_by: Uuid,
    pub reported_at: DateTime<Utc>,
}

// ============================================================================
// License catalog
// ============================================================================

/// Offer terms for licensing one song under one license type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseTemplate {
    pub song_id: String,
    pub license_type: String,
    /// Price in minor currency units
    pub price: u64,
    pub duration_days: u32,
    pub terms: String,
    pub active: bool,
}

/// A license issued to a licensee from an active template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedLicense {
    pub song_id: String,
    pub license_type: String,
    pub licensee: Uuid,
    pub price_paid: u64,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

// ============================================================================
// Input validation
// ============================================================================

/// Validate a caller-supplied identifier (song, payment, platform, version)
pub fn validate_id(label: &str, value: &str) -> LedgerResult<()> {
    if value.is_empty() {
        return Err(LedgerError::InvalidParameter(format!("{} must not be empty", label)));
    }
    if value.len() > MAX_ID_LEN {
        return Err(LedgerError::InvalidParameter(format!(
            "{} exceeds {} bytes",
            label, MAX_ID_LEN
        )));
    }
    if value.chars().any(|c| c.is_control()) {
        return Err(LedgerError::InvalidParameter(format!(
            "{} contains control characters",
            label
        )));
    }
    Ok(())
}

/// Validate a rights-type or license-type tag
pub fn validate_type_tag(label: &str, value: &str) -> LedgerResult<()> {
    if value.is_empty() {
        return Err(LedgerError::InvalidParameter(format!("{} must not be empty", label)));
    }
    if value.len() > MAX_TYPE_LEN {
        return Err(LedgerError::InvalidParameter(format!(
            "{} exceeds {} bytes",
            label, MAX_TYPE_LEN
        )));
    }
    Ok(())
}

/// Validate a bounded free-text field (may be empty)
pub fn validate_text(label: &str, value: &str, max: usize) -> LedgerResult<()> {
    if value.len() > max {
        return Err(LedgerError::InvalidParameter(format!("{} exceeds {} bytes", label, max)));
    }
    Ok(())
}

/// Validate an ownership percentage in basis points
pub fn validate_percentage(percentage: u32) -> LedgerResult<()> {
    if percentage > FULL_OWNERSHIP_BP {
        return Err(LedgerError::InvalidParameter(format!(
            "percentage {} exceeds {} basis points",
            percentage, FULL_OWNERSHIP_BP
        )));
    }
    Ok(())
}

/// Validate a settlement reference: exactly 64 lowercase hex characters
/// (an opaque 32-byte value in hex)
pub fn validate_settlement_ref(value: &str) -> LedgerResult<()> {
    if value.len() != 64 || !value.chars().all(|c| c.is_ascii_digit() || matches!(c, 'a'..='f')) {
        return Err(LedgerError::InvalidParameter(
            "settlement_ref must be 64 lowercase hex characters".to_string(),
        ));
    }
    Ok(())
}

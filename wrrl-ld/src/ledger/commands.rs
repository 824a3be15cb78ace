//! Ledger command types
//!
//! Every mutating operation is one `LedgerCommand` variant. Commands are
//! journaled as JSON (tagged by `op`) before they are applied, so the enum
//! is the wire format of the durable log as well as the API's inner payload.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wrrl_common::records::{Capability, SongFields, SongStatus};

/// A mutating ledger operation, as journaled and applied
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum LedgerCommand {
    /// Add an identity to the administrator set
    AddAdmin { identity: Uuid },

    /// Remove an identity from the administrator set
    RemoveAdmin { identity: Uuid },

    /// Grant a capability to an identity
    GrantCapability {
        capability: Capability,
        identity: Uuid,
    },

    /// Revoke a capability from an identity
    RevokeCapability {
        capability: Capability,
        identity: Uuid,
    },

    /// Register a new song (status starts active)
    RegisterSong {
        song_id: String,
        fields: SongFields,
    },

    /// Replace a song's fields and status wholesale
    UpdateSong {
        song_id: String,
        fields: SongFields,
        status: SongStatus,
    },

    /// Add a rights split for a holder
    AddRightsHolder {
        song_id: String,
        holder: Uuid,
        percentage: u32,
        rights_type: String,
    },

    /// Change a holder's ownership percentage
    UpdateRightsHolder {
        song_id: String,
        holder: Uuid,
        percentage: u32,
    },

    /// Remove a holder's rights split
    RemoveRightsHolder { song_id: String, holder: Uuid },

    /// Record a song version (remix, cover, live, ...)
    AddSongVersion {
        song_id: String,
        version_id: String,
        version_type: String,
        parent_song_id: Option<String>,
    },

    /// Create a usage-backed royalty payment (pending)
    CreateRoyaltyPayment {
        payment_id: String,
        song_id: String,
        platform_id: String,
        reporting_period: String,
        total_amount: u64,
    },

    /// Allocate part of a pending payment to a holder
    AddPaymentDistribution {
        payment_id: String,
        holder: Uuid,
        amount: u64,
        percentage: u32,
        rights_type: String,
    },

    /// Complete a pending payment with its settlement reference
    ProcessRoyaltyPayment {
        payment_id: String,
        settlement_ref: String,
    },

    /// Pay out a pending distribution
    ProcessDistribution { payment_id: String, holder: Uuid },

    /// Record a compensating reversal against a paid distribution
    ReverseDistribution {
        payment_id: String,
        holder: Uuid,
        reason: String,
    },

    /// Record (or overwrite) oracle usage data for a song/platform/period
    RecordUsage {
        song_id: String,
        platform_id: String,
        reporting_period: String,
        play_count: u64,
        revenue: u64,
        verified: bool,
    },

    /// Create or replace a license template
    SetLicenseTemplate {
        song_id: String,
        license_type: String,
        price: u64,
        duration_days: u32,
        terms: String,
        active: bool,
    },

    /// Issue a license to a licensee from an active template
    IssueLicense {
        song_id: String,
        license_type: String,
        licensee: Uuid,
    },
}

impl LedgerCommand {
    /// Operation name as it appears in the journal's `op` tag
    pub fn op_name(&self) -> &'static str {
        match self {
            LedgerCommand::AddAdmin { .. } => "AddAdmin",
            LedgerCommand::RemoveAdmin { .. } => "RemoveAdmin",
            LedgerCommand::GrantCapability { .. } => "GrantCapability",
            LedgerCommand::RevokeCapability { .. } => "RevokeCapability",
            LedgerCommand::RegisterSong { .. } => "RegisterSong",
            LedgerCommand::UpdateSong { .. } => "UpdateSong",
            LedgerCommand::AddRightsHolder { .. } => "AddRightsHolder",
            LedgerCommand::UpdateRightsHolder { .. } => "UpdateRightsHolder",
            LedgerCommand::RemoveRightsHolder { .. } => "RemoveRightsHolder",
            LedgerCommand::AddSongVersion { .. } => "AddSongVersion",
            LedgerCommand::CreateRoyaltyPayment { .. } => "CreateRoyaltyPayment",
            LedgerCommand::AddPaymentDistribution { .. } => "AddPaymentDistribution",
            LedgerCommand::ProcessRoyaltyPayment { .. } => "ProcessRoyaltyPayment",
            LedgerCommand::ProcessDistribution { .. } => "ProcessDistribution",
            LedgerCommand::ReverseDistribution { .. } => "ReverseDistribution",
            LedgerCommand::RecordUsage { .. } => "RecordUsage",
            LedgerCommand::SetLicenseTemplate { .. } => "SetLicenseTemplate",
            LedgerCommand::IssueLicense { .. } => "IssueLicense",
        }
    }
}

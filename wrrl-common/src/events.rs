//! Event types for the WRRL event system
//!
//! One event per successfully applied ledger command, broadcast to SSE
//! subscribers and usable as an audit trail. Timestamps come from the
//! command envelope, so replayed history carries the original times.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::records::{Capability, SongStatus};

/// WRRL ledger event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LedgerEvent {
    /// An identity was added to the administrator set
    AdminAdded {
        identity: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An identity was removed from the administrator set
    AdminRemoved {
        identity: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A capability was granted to an identity
    CapabilityGranted {
        capability: Capability,
        identity: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A capability was revoked from an identity
    CapabilityRevoked {
        capability: Capability,
        identity: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A new song entered the registry
    SongRegistered {
        song_id: String,
        registered_by: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Song fields and/or status were replaced
    SongUpdated {
        song_id: String,
        status: SongStatus,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A rights split was added for a holder
    RightsHolderAdded {
        song_id: String,
        holder: Uuid,
        percentage: u32,
        rights_type: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A holder's ownership percentage changed
    RightsHolderUpdated {
        song_id: String,
        holder: Uuid,
        percentage: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A rights split was removed
    RightsHolderRemoved {
        song_id: String,
        holder: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A song version was recorded
    SongVersionAdded {
        song_id: String,
        version_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A royalty payment was created (pending)
    PaymentCreated {
        payment_id: String,
        song_id: String,
        total_amount: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A per-holder distribution was allocated on a pending payment
    DistributionAdded {
        payment_id: String,
        holder: Uuid,
        amount: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A payment transitioned pending -> completed
    PaymentCompleted {
        payment_id: String,
        settlement_ref: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A distribution transitioned pending -> paid
    DistributionPaid {
        payment_id: String,
        holder: Uuid,
        amount: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A compensating reversal was recorded against a paid distribution
    DistributionReversed {
        payment_id: String,
        holder: Uuid,
        amount: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Usage data was recorded for a song / platform / period
    UsageRecorded {
        song_id: String,
        platform_id: String,
        reporting_period: String,
        verified: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A license template was created or replaced
    LicenseTemplateSet {
        song_id: String,
        license_type: String,
        active: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A license was issued to a licensee
    LicenseIssued {
        song_id: String,
        license_type: String,
        licensee: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl LedgerEvent {
    /// Event type tag as it appears on the wire
    pub fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::AdminAdded { .. } => "AdminAdded",
            LedgerEvent::AdminRemoved { .. } => "AdminRemoved",
            LedgerEvent::CapabilityGranted { .. } => "CapabilityGranted",
            LedgerEvent::CapabilityRevoked { .. } => "CapabilityRevoked",
            LedgerEvent::SongRegistered { .. } => "SongRegistered",
            LedgerEvent::SongUpdated { .. } => "SongUpdated",
            LedgerEvent::RightsHolderAdded { .. } => "RightsHolderAdded",
            LedgerEvent::RightsHolderUpdated { .. } => "RightsHolderUpdated",
            LedgerEvent::RightsHolderRemoved { .. } => "RightsHolderRemoved",
            LedgerEvent::SongVersionAdded { .. } => "SongVersionAdded",
            LedgerEvent::PaymentCreated { .. } => "PaymentCreated",
            LedgerEvent::DistributionAdded { .. } => "DistributionAdded",
            LedgerEvent::PaymentCompleted { .. } => "PaymentCompleted",
            LedgerEvent::DistributionPaid { .. } => "DistributionPaid",
            LedgerEvent::DistributionReversed { .. } => "DistributionReversed",
            LedgerEvent::UsageRecorded { .. } => "UsageRecorded",
            LedgerEvent::LicenseTemplateSet { .. } => "LicenseTemplateSet",
            LedgerEvent::LicenseIssued { .. } => "LicenseIssued",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = LedgerEvent::PaymentCreated {
            payment_id: "PAY-1".to_string(),
            song_id: "SONG-1".to_string(),
            total_amount: 1000,
            timestamp: chrono::Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "PaymentCreated");
        assert_eq!(json["payment_id"], "PAY-1");
        assert_eq!(json["total_amount"], 1000);
    }

    #[test]
    fn test_event_type_matches_serde_tag() {
        let event = LedgerEvent::SongRegistered {
            song_id: "SONG-1".to_string(),
            registered_by: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.event_type());
    }
}

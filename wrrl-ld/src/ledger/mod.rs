//! The rights and royalty ledger state machine
//!
//! `Ledger` aggregates the five in-memory components (roles, rights
//! registry, royalty engine, usage oracle, license catalog) behind a single
//! deterministic `apply` entry point. State is a pure function of the
//! envelope history: every input to a command's outcome travels inside its
//! `CommandEnvelope` (sequence number, caller, submission time, command),
//! never from ambient clocks or randomness, so replaying a journal
//! reproduces the exact same state including the same rejections.
//!
//! Sequence numbers count submissions, not successes. A rejected command
//! still consumes its sequence number, which keeps live numbering and
//! replayed numbering in lockstep.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wrrl_common::error::LedgerResult;
use wrrl_common::events::LedgerEvent;

pub mod commands;
pub mod licensing;
pub mod registry;
pub mod roles;
pub mod royalty;
pub mod usage;

pub use commands::LedgerCommand;
pub use licensing::LicenseCatalog;
pub use registry::RightsRegistry;
pub use roles::RoleStore;
pub use royalty::RoyaltyEngine;
pub use usage::UsageStore;

/// A journaled command with everything its outcome may depend on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    /// Position in the command history, starting at 1
    pub seq: u64,

    /// Authenticated identity the command acts as
    pub caller: Uuid,

    /// Submission time, recorded once at journal append
    pub submitted_at: DateTime<Utc>,

    pub command: LedgerCommand,
}

/// In-memory ledger state, rebuilt from the journal at startup
#[derive(Debug, Clone)]
pub struct Ledger {
    roles: RoleStore,
    registry: RightsRegistry,
    royalty: RoyaltyEngine,
    usage: UsageStore,
    licensing: LicenseCatalog,
    last_seq: u64,
}

impl Ledger {
    pub fn new(bootstrap_admin: Uuid) -> Self {
        Ledger {
            roles: RoleStore::new(bootstrap_admin),
            registry: RightsRegistry::new(),
            royalty: RoyaltyEngine::new(),
            usage: UsageStore::new(),
            licensing: LicenseCatalog::new(),
            last_seq: 0,
        }
    }

    /// Sequence number of the most recently applied envelope (0 when fresh)
    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    /// Sequence number the next submission must carry
    pub fn next_seq(&self) -> u64 {
        self.last_seq + 1
    }

    pub fn roles(&self) -> &RoleStore {
        &self.roles
    }

    pub fn registry(&self) -> &RightsRegistry {
        &self.registry
    }

    pub fn royalty(&self) -> &RoyaltyEngine {
        &self.royalty
    }

    pub fn usage(&self) -> &UsageStore {
        &self.usage
    }

    pub fn licensing(&self) -> &LicenseCatalog {
        &self.licensing
    }

    /// Apply one journaled envelope. Validation happens before any state
    /// change, so an error means the components are untouched; only the
    /// sequence counter advances, because the envelope did consume its
    /// place in history.
    pub fn apply(&mut self, env: &CommandEnvelope) -> LedgerResult<LedgerEvent> {
        self.last_seq = env.seq;
        let caller = env.caller;
        let at = env.submitted_at;

        match &env.command {
            LedgerCommand::AddAdmin { identity } => {
                self.roles.add_admin(caller, *identity)?;
                Ok(LedgerEvent::AdminAdded { identity: *identity, timestamp: at })
            }
            LedgerCommand::RemoveAdmin { identity } => {
                self.roles.remove_admin(caller, *identity)?;
                Ok(LedgerEvent::AdminRemoved { identity: *identity, timestamp: at })
            }
            LedgerCommand::GrantCapability { capability, identity } => {
                self.roles.grant_capability(caller, *capability, *identity)?;
                Ok(LedgerEvent::CapabilityGranted {
                    capability: *capability,
                    identity: *identity,
                    timestamp: at,
                })
            }
            LedgerCommand::RevokeCapability { capability, identity } => {
                self.roles.revoke_capability(caller, *capability, *identity)?;
                Ok(LedgerEvent::CapabilityRevoked {
                    capability: *capability,
                    identity: *identity,
                    timestamp: at,
                })
            }
            LedgerCommand::RegisterSong { song_id, fields } => {
                self.registry
                    .register_song(&self.roles, caller, env.seq, song_id, fields)?;
                Ok(LedgerEvent::SongRegistered {
                    song_id: song_id.clone(),
                    registered_by: caller,
                    timestamp: at,
                })
            }
            LedgerCommand::UpdateSong { song_id, fields, status } => {
                self.registry
                    .update_song(&self.roles, caller, song_id, fields, *status)?;
                Ok(LedgerEvent::SongUpdated {
                    song_id: song_id.clone(),
                    status: *status,
                    timestamp: at,
                })
            }
            LedgerCommand::AddRightsHolder { song_id, holder, percentage, rights_type } => {
                self.registry.add_rights_holder(
                    &self.roles,
                    caller,
                    at,
                    song_id,
                    *holder,
                    *percentage,
                    rights_type,
                )?;
                Ok(LedgerEvent::RightsHolderAdded {
                    song_id: song_id.clone(),
                    holder: *holder,
                    percentage: *percentage,
                    rights_type: rights_type.clone(),
                    timestamp: at,
                })
            }
            LedgerCommand::UpdateRightsHolder { song_id, holder, percentage } => {
                self.registry.update_rights_holder(
                    &self.roles,
                    caller,
                    at,
                    song_id,
                    *holder,
                    *percentage,
                )?;
                Ok(LedgerEvent::RightsHolderUpdated {
                    song_id: song_id.clone(),
                    holder: *holder,
                    percentage: *percentage,
                    timestamp: at,
                })
            }
            LedgerCommand::RemoveRightsHolder { song_id, holder } => {
                self.registry
                    .remove_rights_holder(&self.roles, caller, song_id, *holder)?;
                Ok(LedgerEvent::RightsHolderRemoved {
                    song_id: song_id.clone(),
                    holder: *holder,
                    timestamp: at,
                })
            }
            LedgerCommand::AddSongVersion { song_id, version_id, version_type, parent_song_id } => {
                self.registry.add_song_version(
                    &self.roles,
                    caller,
                    at,
                    song_id,
                    version_id,
                    version_type,
                    parent_song_id.as_deref(),
                )?;
                Ok(LedgerEvent::SongVersionAdded {
                    song_id: song_id.clone(),
                    version_id: version_id.clone(),
                    timestamp: at,
                })
            }
            LedgerCommand::CreateRoyaltyPayment {
                payment_id,
                song_id,
                platform_id,
                reporting_period,
                total_amount,
            } => {
                self.royalty.create_royalty_payment(
                    &self.roles,
                    &self.registry,
                    &self.usage,
                    caller,
                    at,
                    payment_id,
                    song_id,
                    platform_id,
                    reporting_period,
                    *total_amount,
                )?;
                Ok(LedgerEvent::PaymentCreated {
                    payment_id: payment_id.clone(),
                    song_id: song_id.clone(),
                    total_amount: *total_amount,
                    timestamp: at,
                })
            }
            LedgerCommand::AddPaymentDistribution {
                payment_id,
                holder,
                amount,
                percentage,
                rights_type,
            } => {
                self.royalty.add_payment_distribution(
                    &self.roles,
                    &self.registry,
                    caller,
                    payment_id,
                    *holder,
                    *amount,
                    *percentage,
                    rights_type,
                )?;
                Ok(LedgerEvent::DistributionAdded {
                    payment_id: payment_id.clone(),
                    holder: *holder,
                    amount: *amount,
                    timestamp: at,
                })
            }
            LedgerCommand::ProcessRoyaltyPayment { payment_id, settlement_ref } => {
                self.royalty
                    .process_royalty_payment(&self.roles, caller, payment_id, settlement_ref)?;
                Ok(LedgerEvent::PaymentCompleted {
                    payment_id: payment_id.clone(),
                    settlement_ref: settlement_ref.clone(),
                    timestamp: at,
                })
            }
            LedgerCommand::ProcessDistribution { payment_id, holder } => {
                let amount = self
                    .royalty
                    .process_distribution(&self.roles, caller, at, payment_id, *holder)?;
                Ok(LedgerEvent::DistributionPaid {
                    payment_id: payment_id.clone(),
                    holder: *holder,
                    amount,
                    timestamp: at,
                })
            }
            LedgerCommand::ReverseDistribution { payment_id, holder, reason } => {
                let amount = self.royalty.reverse_distribution(
                    &self.roles,
                    caller,
                    at,
                    payment_id,
                    *holder,
                    reason,
                )?;
                Ok(LedgerEvent::DistributionReversed {
                    payment_id: payment_id.clone(),
                    holder: *holder,
                    amount,
                    timestamp: at,
                })
            }
            LedgerCommand::RecordUsage {
                song_id,
                platform_id,
                reporting_period,
                play_count,
                revenue,
                verified,
            } => {
                self.usage.record_usage(
                    &self.roles,
                    caller,
                    at,
                    song_id,
                    platform_id,
                    reporting_period,
                    *play_count,
                    *revenue,
                    *verified,
                )?;
                Ok(LedgerEvent::UsageRecorded {
                    song_id: song_id.clone(),
                    platform_id: platform_id.clone(),
                    reporting_period: reporting_period.clone(),
                    verified: *verified,
                    timestamp: at,
                })
            }
            LedgerCommand::SetLicenseTemplate {
                song_id,
                license_type,
                price,
                duration_days,
                terms,
                active,
            } => {
                self.licensing.set_license_template(
                    &self.roles,
                    &self.registry,
                    caller,
                    song_id,
                    license_type,
                    *price,
                    *duration_days,
                    terms,
                    *active,
                )?;
                Ok(LedgerEvent::LicenseTemplateSet {
                    song_id: song_id.clone(),
                    license_type: license_type.clone(),
                    active: *active,
                    timestamp: at,
                })
            }
            LedgerCommand::IssueLicense { song_id, license_type, licensee } => {
                self.licensing.issue_license(
                    &self.roles,
                    &self.registry,
                    caller,
                    at,
                    song_id,
                    license_type,
                    *licensee,
                )?;
                Ok(LedgerEvent::LicenseIssued {
                    song_id: song_id.clone(),
                    license_type: license_type.clone(),
                    licensee: *licensee,
                    timestamp: at,
                })
            }
        }
    }

    /// Re-apply a journaled history in order. Rejections are part of the
    /// history and are counted, not fatal. Returns (applied, rejected).
    pub fn replay<'a, I>(&mut self, envelopes: I) -> (u64, u64)
    where
        I: IntoIterator<Item = &'a CommandEnvelope>,
    {
        let mut applied = 0;
        let mut rejected = 0;
        for env in envelopes {
            match self.apply(env) {
                Ok(_) => applied += 1,
                Err(_) => rejected += 1,
            }
        }
        (applied, rejected)
    }
}

//! Access control: administrator set and capability grants
//!
//! A fixed bootstrap administrator (pinned in the settings table at first
//! startup) is implicitly an administrator forever and cannot be removed.
//! Administrators hold every capability implicitly; other identities act
//! only through explicit grants.

use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use wrrl_common::error::{LedgerError, LedgerResult};
use wrrl_common::records::Capability;

/// Administrator set and per-capability identity sets
#[derive(Debug, Clone)]
pub struct RoleStore {
    /// Permanent implicit administrator, never stored in `admins`
    bootstrap_admin: Uuid,

    admins: BTreeSet<Uuid>,

    grants: BTreeMap<Capability, BTreeSet<Uuid>>,
}

impl RoleStore {
    pub fn new(bootstrap_admin: Uuid) -> Self {
        RoleStore {
            bootstrap_admin,
            admins: BTreeSet::new(),
            grants: BTreeMap::new(),
        }
    }

    pub fn bootstrap_admin(&self) -> Uuid {
        self.bootstrap_admin
    }

    /// True for the bootstrap admin and every added administrator
    pub fn is_admin(&self, identity: Uuid) -> bool {
        identity == self.bootstrap_admin || self.admins.contains(&identity)
    }

    /// Administrators implicitly hold every capability
    pub fn has_capability(&self, capability: Capability, identity: Uuid) -> bool {
        if self.is_admin(identity) {
            return true;
        }
        self.grants
            .get(&capability)
            .map(|set| set.contains(&identity))
            .unwrap_or(false)
    }

    /// All explicit grants held by an identity (admin status not included)
    pub fn capabilities_of(&self, identity: Uuid) -> Vec<Capability> {
        self.grants
            .iter()
            .filter(|(_, set)| set.contains(&identity))
            .map(|(capability, _)| *capability)
            .collect()
    }

    pub fn require_admin(&self, caller: Uuid) -> LedgerResult<()> {
        if self.is_admin(caller) {
            return Ok(());
        }
        Err(LedgerError::Authorization(format!(
            "caller {} is not an administrator",
            caller
        )))
    }

    pub fn require_capability(&self, capability: Capability, caller: Uuid) -> LedgerResult<()> {
        if self.has_capability(capability, caller) {
            return Ok(());
        }
        Err(LedgerError::Authorization(format!(
            "caller {} lacks the {} capability",
            caller, capability
        )))
    }

    pub fn add_admin(&mut self, caller: Uuid, identity: Uuid) -> LedgerResult<()> {
        self.require_admin(caller)?;
        if self.is_admin(identity) {
            return Err(LedgerError::AlreadyExists(format!(
                "{} is already an administrator",
                identity
            )));
        }
        self.admins.insert(identity);
        Ok(())
    }

    pub fn remove_admin(&mut self, caller: Uuid, identity: Uuid) -> LedgerResult<()> {
        self.require_admin(caller)?;
        if identity == self.bootstrap_admin {
            return Err(LedgerError::InvalidParameter(
                "the bootstrap administrator cannot be removed".to_string(),
            ));
        }
        if !self.admins.remove(&identity) {
            return Err(LedgerError::NotFound(format!(
                "{} is not an administrator",
                identity
            )));
        }
        Ok(())
    }

    pub fn grant_capability(
        &mut self,
        caller: Uuid,
        capability: Capability,
        identity: Uuid,
    ) -> LedgerResult<()> {
        self.require_admin(caller)?;
        let set = self.grants.entry(capability).or_default();
        if !set.insert(identity) {
            return Err(LedgerError::AlreadyExists(format!(
                "{} already holds {}",
                identity, capability
            )));
        }
        Ok(())
    }

    pub fn revoke_capability(
        &mut self,
        caller: Uuid,
        capability: Capability,
        identity: Uuid,
    ) -> LedgerResult<()> {
        self.require_admin(caller)?;
        let removed = self
            .grants
            .get_mut(&capability)
            .map(|set| set.remove(&identity))
            .unwrap_or(false);
        if !removed {
            return Err(LedgerError::NotFound(format!(
                "{} does not hold {}",
                identity, capability
            )));
        }
        Ok(())
    }
}

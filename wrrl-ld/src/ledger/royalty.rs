//! Royalty engine: payments, distributions, reversals, holder totals
//!
//! Owns royalty payments and their per-holder distributions, plus two
//! maintained indices: per-payment allocated totals (so distributions can
//! never overrun a payment) and per-holder lifetime totals. Paid money is
//! never un-paid; corrections are separate reversal records and gross
//! totals stay intact.
//!
//! Payment creation is gated on the usage oracle: the exact
//! (song, platform, period) triple must have a verified usage record.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

use wrrl_common::error::{LedgerError, LedgerResult};
use wrrl_common::records::{
    validate_id, validate_percentage, validate_settlement_ref, validate_text, validate_type_tag,
    AllocationLine, Capability, DistributionReversal, DistributionStatus, HolderTotals,
    PaymentDistribution, PaymentStatus, RoyaltyPayment, MAX_PERIOD_LEN, MAX_TEXT_LEN,
};

use super::registry::RightsRegistry;
use super::roles::RoleStore;
use super::usage::UsageStore;

/// Payments, distributions, and the allocated/holder-totals indices
#[derive(Debug, Clone, Default)]
pub struct RoyaltyEngine {
    payments: BTreeMap<String, RoyaltyPayment>,

    /// (payment_id, holder) -> distribution; one per holder per payment
    distributions: BTreeMap<(String, Uuid), PaymentDistribution>,

    /// (payment_id, holder) -> reversal; at most one per distribution
    reversals: BTreeMap<(String, Uuid), DistributionReversal>,

    /// payment_id -> sum of distribution amounts, kept in lockstep with
    /// `distributions`; never exceeds the payment's total_amount
    allocated: BTreeMap<String, u64>,

    /// Lifetime gross totals per holder, updated when distributions pay out
    holder_totals: BTreeMap<Uuid, HolderTotals>,
}

impl RoyaltyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Open a pending payment for a usage-verified (song, platform, period)
    #[allow(clippy::too_many_arguments)]
    pub fn create_royalty_payment(
        &mut self,
        roles: &RoleStore,
        registry: &RightsRegistry,
        usage: &UsageStore,
        caller: Uuid,
        now: DateTime<Utc>,
        payment_id: &str,
        song_id: &str,
        platform_id: &str,
        reporting_period: &str,
        total_amount: u64,
    ) -> LedgerResult<()> {
        roles.require_capability(Capability::PaymentProcessor, caller)?;
        validate_id("payment_id", payment_id)?;
        validate_id("song_id", song_id)?;
        validate_id("platform_id", platform_id)?;
        validate_text("reporting_period", reporting_period, MAX_PERIOD_LEN)?;
        if reporting_period.is_empty() {
            return Err(LedgerError::InvalidParameter(
                "reporting_period must not be empty".to_string(),
            ));
        }
        if self.payments.contains_key(payment_id) {
            return Err(LedgerError::AlreadyExists(format!("payment {}", payment_id)));
        }
        if registry.song(song_id).is_none() {
            return Err(LedgerError::NotFound(format!("song {}", song_id)));
        }
        match usage.usage(song_id, platform_id, reporting_period) {
            Some(record) if record.verified => {}
            Some(_) => {
                return Err(LedgerError::ExternalVerification(format!(
                    "usage of song {} on {} in {} is reported but not verified",
                    song_id, platform_id, reporting_period
                )))
            }
            None => {
                return Err(LedgerError::ExternalVerification(format!(
                    "no usage record for song {} on {} in {}",
                    song_id, platform_id, reporting_period
                )))
            }
        }

        self.payments.insert(
            payment_id.to_string(),
            RoyaltyPayment {
                payment_id: payment_id.to_string(),
                song_id: song_id.to_string(),
                platform_id: platform_id.to_string(),
                reporting_period: reporting_period.to_string(),
                total_amount,
                created_at: now,
                status: PaymentStatus::Pending,
                settlement_ref: None,
            },
        );
        Ok(())
    }

    /// Attach a holder's share to a pending payment. The claimed
    /// (rights_type, percentage) must match the holder's registered split,
    /// and the payment's allocated total must stay within total_amount.
    #[allow(clippy::too_many_arguments)]
    pub fn add_payment_distribution(
        &mut self,
        roles: &RoleStore,
        registry: &RightsRegistry,
        caller: Uuid,
        payment_id: &str,
        holder: Uuid,
        amount: u64,
        percentage: u32,
        rights_type: &str,
    ) -> LedgerResult<()> {
        roles.require_capability(Capability::PaymentProcessor, caller)?;
        let payment = self
            .payments
            .get(payment_id)
            .ok_or_else(|| LedgerError::NotFound(format!("payment {}", payment_id)))?;
        if payment.status != PaymentStatus::Pending {
            return Err(LedgerError::StateConflict(format!(
                "payment {} is {}, distributions may only be added while pending",
                payment_id, payment.status
            )));
        }
        let key = (payment_id.to_string(), holder);
        if self.distributions.contains_key(&key) {
            return Err(LedgerError::AlreadyExists(format!(
                "distribution to {} on payment {}",
                holder, payment_id
            )));
        }
        validate_percentage(percentage)?;
        validate_type_tag("rights_type", rights_type)?;

        // The claimed share must agree with the rights registry
        match registry.rights_split(&payment.song_id, holder) {
            Some(split) if split.rights_type == rights_type && split.percentage == percentage => {}
            Some(split) => {
                return Err(LedgerError::InvalidParameter(format!(
                    "distribution claims {} bp of {} but {} holds {} bp of {} on song {}",
                    percentage, rights_type, holder, split.percentage, split.rights_type,
                    payment.song_id
                )))
            }
            None => {
                return Err(LedgerError::InvalidParameter(format!(
                    "{} holds no rights on song {}",
                    holder, payment.song_id
                )))
            }
        }

        let allocated = self.allocated.get(payment_id).copied().unwrap_or(0);
        let would_be = allocated.checked_add(amount).ok_or_else(|| {
            LedgerError::InvalidParameter("distribution amount overflows".to_string())
        })?;
        if would_be > payment.total_amount {
            return Err(LedgerError::InvalidParameter(format!(
                "allocating {} would put payment {} at {} of {} total",
                amount, payment_id, would_be, payment.total_amount
            )));
        }

        self.distributions.insert(
            key,
            PaymentDistribution {
                payment_id: payment_id.to_string(),
                holder,
                amount,
                percentage,
                rights_type: rights_type.to_string(),
                status: DistributionStatus::Pending,
                paid_at: None,
            },
        );
        self.allocated.insert(payment_id.to_string(), would_be);
        Ok(())
    }

    /// Complete a pending payment, recording the settlement reference.
    /// One-way: a completed payment never returns to pending.
    pub fn process_royalty_payment(
        &mut self,
        roles: &RoleStore,
        caller: Uuid,
        payment_id: &str,
        settlement_ref: &str,
    ) -> LedgerResult<()> {
        roles.require_capability(Capability::PaymentProcessor, caller)?;
        validate_settlement_ref(settlement_ref)?;
        let payment = self
            .payments
            .get_mut(payment_id)
            .ok_or_else(|| LedgerError::NotFound(format!("payment {}", payment_id)))?;
        if payment.status != PaymentStatus::Pending {
            return Err(LedgerError::StateConflict(format!(
                "payment {} is already {}",
                payment_id, payment.status
            )));
        }
        payment.status = PaymentStatus::Completed;
        payment.settlement_ref = Some(settlement_ref.to_string());
        Ok(())
    }

    /// Pay out a pending distribution and credit the holder's lifetime
    /// totals. One-way: a paid distribution never returns to pending.
    /// Returns the amount paid.
    pub fn process_distribution(
        &mut self,
        roles: &RoleStore,
        caller: Uuid,
        now: DateTime<Utc>,
        payment_id: &str,
        holder: Uuid,
    ) -> LedgerResult<u64> {
        roles.require_capability(Capability::PaymentProcessor, caller)?;
        let key = (payment_id.to_string(), holder);
        let dist = self.distributions.get_mut(&key).ok_or_else(|| {
            LedgerError::NotFound(format!("distribution to {} on payment {}", holder, payment_id))
        })?;
        if dist.status != DistributionStatus::Pending {
            return Err(LedgerError::StateConflict(format!(
                "distribution to {} on payment {} is already {}",
                holder, payment_id, dist.status
            )));
        }
        let amount = dist.amount;

        // Totals accumulate across payments; checked before any state
        // change so a rejected payout leaves the distribution pending
        let prior = self.holder_totals.get(&holder).map_or(0, |t| t.total_paid);
        let total_paid = prior.checked_add(amount).ok_or_else(|| {
            LedgerError::InvalidParameter(format!(
                "paying {} would overflow lifetime totals of holder {}",
                amount, holder
            ))
        })?;

        dist.status = DistributionStatus::Paid;
        dist.paid_at = Some(now);
        let totals = self.holder_totals.entry(holder).or_default();
        totals.total_paid = total_paid;
        totals.last_payment_at = Some(now);
        Ok(amount)
    }

    /// Record a compensating reversal against a paid distribution. The
    /// distribution stays paid and gross totals stand; the reversal amount
    /// accrues to the holder's total_reversed. At most one reversal per
    /// distribution. Returns the reversed amount.
    pub fn reverse_distribution(
        &mut self,
        roles: &RoleStore,
        caller: Uuid,
        now: DateTime<Utc>,
        payment_id: &str,
        holder: Uuid,
        reason: &str,
    ) -> LedgerResult<u64> {
        roles.require_capability(Capability::PaymentProcessor, caller)?;
        if reason.is_empty() {
            return Err(LedgerError::InvalidParameter("reason must not be empty".to_string()));
        }
        validate_text("reason", reason, MAX_TEXT_LEN)?;
        let key = (payment_id.to_string(), holder);
        let dist = self.distributions.get(&key).ok_or_else(|| {
            LedgerError::NotFound(format!("distribution to {} on payment {}", holder, payment_id))
        })?;
        if dist.status != DistributionStatus::Paid {
            return Err(LedgerError::StateConflict(format!(
                "distribution to {} on payment {} is {}, only paid distributions reverse",
                holder, payment_id, dist.status
            )));
        }
        if self.reversals.contains_key(&key) {
            return Err(LedgerError::AlreadyExists(format!(
                "reversal of distribution to {} on payment {}",
                holder, payment_id
            )));
        }
        let amount = dist.amount;
        let prior = self.holder_totals.get(&holder).map_or(0, |t| t.total_reversed);
        let total_reversed = prior.checked_add(amount).ok_or_else(|| {
            LedgerError::InvalidParameter(format!(
                "reversing {} would overflow lifetime totals of holder {}",
                amount, holder
            ))
        })?;

        self.reversals.insert(
            key,
            DistributionReversal {
                payment_id: payment_id.to_string(),
                holder,
                amount,
                reason: reason.to_string(),
                reversed_at: now,
            },
        );
        self.holder_totals.entry(holder).or_default().total_reversed = total_reversed;
        Ok(amount)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn payment(&self, payment_id: &str) -> Option<&RoyaltyPayment> {
        self.payments.get(payment_id)
    }

    pub fn distribution(&self, payment_id: &str, holder: Uuid) -> Option<&PaymentDistribution> {
        self.distributions.get(&(payment_id.to_string(), holder))
    }

    pub fn reversal(&self, payment_id: &str, holder: Uuid) -> Option<&DistributionReversal> {
        self.reversals.get(&(payment_id.to_string(), holder))
    }

    /// All distributions of a payment, in ascending holder order
    pub fn distributions_for_payment(&self, payment_id: &str) -> Vec<&PaymentDistribution> {
        self.distributions
            .range((payment_id.to_string(), Uuid::nil())..)
            .take_while(|((pid, _), _)| pid == payment_id)
            .map(|(_, dist)| dist)
            .collect()
    }

    /// Lifetime totals for a holder; zeroes when the holder was never paid
    pub fn holder_totals(&self, holder: Uuid) -> HolderTotals {
        self.holder_totals.get(&holder).cloned().unwrap_or_default()
    }

    /// Sum of distribution amounts recorded against a payment
    pub fn allocated_amount(&self, payment_id: &str) -> u64 {
        self.allocated.get(payment_id).copied().unwrap_or(0)
    }

    /// Preview how a hypothetical amount would divide over a song's
    /// registered splits, grouped by rights type.
    ///
    /// Within each rights type the amount is shared by largest remainder:
    /// every holder gets floor(amount * percentage / type_total), then the
    /// leftover units (always fewer than the holder count) go one each to
    /// the largest fractional remainders, holder id breaking ties. Each
    /// group sums to exactly `total_amount` and the result is independent
    /// of insertion history.
    pub fn calculate_royalty_distribution(
        &self,
        registry: &RightsRegistry,
        song_id: &str,
        total_amount: u64,
    ) -> LedgerResult<BTreeMap<String, Vec<AllocationLine>>> {
        if registry.song(song_id).is_none() {
            return Err(LedgerError::NotFound(format!("song {}", song_id)));
        }
        let splits = registry.splits_for_song(song_id);
        if splits.is_empty() {
            return Err(LedgerError::InvalidParameter(format!(
                "song {} has no registered rights splits",
                song_id
            )));
        }

        let mut by_type: BTreeMap<String, Vec<(Uuid, u32)>> = BTreeMap::new();
        for split in splits {
            by_type
                .entry(split.rights_type.clone())
                .or_default()
                .push((split.holder, split.percentage));
        }

        let mut result = BTreeMap::new();
        for (rights_type, holders) in by_type {
            let type_total: u64 = holders.iter().map(|(_, pct)| *pct as u64).sum();
            if type_total == 0 {
                return Err(LedgerError::InvalidParameter(format!(
                    "{} splits of song {} sum to zero",
                    rights_type, song_id
                )));
            }

            // Floor shares plus fractional remainders, widened so
            // amount * percentage cannot overflow
            let mut lines: Vec<(Uuid, u32, u64, u64)> = holders
                .iter()
                .map(|&(holder, pct)| {
                    let product = total_amount as u128 * pct as u128;
                    let floor = (product / type_total as u128) as u64;
                    let remainder = (product % type_total as u128) as u64;
                    (holder, pct, floor, remainder)
                })
                .collect();
            let floored: u64 = lines.iter().map(|(_, _, floor, _)| floor).sum();
            let mut leftover = total_amount - floored;

            lines.sort_by(|a, b| b.3.cmp(&a.3).then(a.0.cmp(&b.0)));
            let mut allocations: Vec<AllocationLine> = lines
                .into_iter()
                .map(|(holder, percentage, mut amount, _)| {
                    if leftover > 0 {
                        amount += 1;
                        leftover -= 1;
                    }
                    AllocationLine { holder, percentage, amount }
                })
                .collect();
            allocations.sort_by(|a, b| a.holder.cmp(&b.holder));
            result.insert(rights_type, allocations);
        }
        Ok(result)
    }
}

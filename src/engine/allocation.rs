//! Tiered waterfall allocation with pro-rata shortfall balancing.
//!
//! Tiers are paid strictly in rank order. A tier whose requirement exceeds
//! what is left is paid pro-rata and every tier below it receives nothing.
//! All arithmetic is integer minor units; the pro-rata factor is reported as
//! an `f64` for display only and never feeds back into amounts.

use crate::error::{Error, Result};
use crate::money::Money;
use crate::registry::tier::{validate_tiers, Tier};
use serde::{Deserialize, Serialize};

/// Funds available for one allocation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub total_available: Money,
}

impl Pool {
    pub fn new(total_available: Money) -> Result<Self> {
        let pool = Pool { total_available };
        pool.validate()?;
        Ok(pool)
    }

    pub fn validate(&self) -> Result<()> {
        if self.total_available.is_negative() {
            return Err(Error::Input(format!(
                "Pool amount must not be negative, got {}",
                self.total_available
            )));
        }
        Ok(())
    }
}

/// What one recipient receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipientAllocation {
    pub recipient_id: String,
    pub required: Money,
    pub allocated: Money,
    /// Set only for recipients of a pro-rata (underfunded) tier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pro_rata_factor: Option<f64>,
}

/// Outcome for one tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationResult {
    pub rank: u32,
    pub name: String,
    pub required_total: Money,
    pub allocated_total: Money,
    pub shortfall: Money,
    /// 1.0 fully funded, 0.0 starved, in between when pro-rated.
    pub pro_rata_factor: f64,
    pub is_underfunded: bool,
    pub per_recipient: Vec<RecipientAllocation>,
}

impl AllocationResult {
    pub fn is_fully_funded(&self) -> bool {
        self.shortfall.is_zero()
    }

    fn fully_funded(tier: &Tier) -> Self {
        AllocationResult {
            rank: tier.rank,
            name: tier.name.clone(),
            required_total: tier.required_total,
            allocated_total: tier.required_total,
            shortfall: Money::ZERO,
            pro_rata_factor: 1.0,
            is_underfunded: false,
            per_recipient: tier
                .recipients
                .iter()
                .map(|r| RecipientAllocation {
                    recipient_id: r.id.clone(),
                    required: r.required_amount,
                    allocated: r.required_amount,
                    pro_rata_factor: None,
                })
                .collect(),
        }
    }

    fn starved(tier: &Tier) -> Self {
        AllocationResult {
            rank: tier.rank,
            name: tier.name.clone(),
            required_total: tier.required_total,
            allocated_total: Money::ZERO,
            shortfall: tier.required_total,
            pro_rata_factor: 0.0,
            is_underfunded: !tier.required_total.is_zero(),
            per_recipient: tier
                .recipients
                .iter()
                .map(|r| RecipientAllocation {
                    recipient_id: r.id.clone(),
                    required: r.required_amount,
                    allocated: Money::ZERO,
                    pro_rata_factor: Some(0.0),
                })
                .collect(),
        }
    }
}

/// Allocate `pool` across `tiers` in rank order.
///
/// Fails with `Error::Config` on an invalid tier list, `Error::Input` on a
/// negative pool, and `Error::RoundingReconciliation` if the computed result
/// does not reconcile exactly.
pub fn allocate(pool: &Pool, tiers: &[Tier]) -> Result<Vec<AllocationResult>> {
    pool.validate()?;
    validate_tiers(tiers)?;

    let mut ordered: Vec<&Tier> = tiers.iter().collect();
    ordered.sort_by_key(|t| t.rank);

    let mut remaining = pool.total_available;
    let mut results = Vec::with_capacity(ordered.len());

    for tier in ordered {
        let result = if remaining >= tier.required_total {
            remaining = remaining
                .checked_sub(tier.required_total)
                .ok_or_else(|| reconciliation(tier.rank, "remaining underflow"))?;
            log::debug!(
                "Tier {} '{}' fully funded ({}); {} remaining",
                tier.rank,
                tier.name,
                tier.required_total,
                remaining
            );
            AllocationResult::fully_funded(tier)
        } else if remaining.is_zero() {
            log::debug!("Tier {} '{}' receives nothing", tier.rank, tier.name);
            AllocationResult::starved(tier)
        } else {
            let result = pro_rata(tier, remaining)?;
            log::warn!(
                "Tier {} '{}' underfunded: {} of {} (factor {:.4})",
                tier.rank,
                tier.name,
                result.allocated_total,
                tier.required_total,
                result.pro_rata_factor
            );
            remaining = Money::ZERO;
            result
        };
        results.push(result);
    }

    reconcile(pool, &results)?;
    Ok(results)
}

/// Pro-rate `available` (strictly less than the tier requirement) across the
/// tier. Shares are truncated; the residual goes to the last recipient.
fn pro_rata(tier: &Tier, available: Money) -> Result<AllocationResult> {
    let required = i128::from(tier.required_total.minor());
    let avail = i128::from(available.minor());
    let factor = available.minor() as f64 / tier.required_total.minor() as f64;

    let mut shares: Vec<i64> = Vec::with_capacity(tier.recipients.len());
    for r in &tier.recipients {
        let exact = i128::from(r.required_amount.minor()) * avail / required;
        let share = i64::try_from(exact).map_err(|_| reconciliation(tier.rank, "share overflow"))?;
        shares.push(share);
    }

    let assigned: i64 = shares.iter().sum();
    let residual = available.minor() - assigned;
    distribute_residual(tier, &mut shares, residual)?;

    let per_recipient = tier
        .recipients
        .iter()
        .zip(shares)
        .map(|(r, share)| RecipientAllocation {
            recipient_id: r.id.clone(),
            required: r.required_amount,
            allocated: Money::from_minor(share),
            pro_rata_factor: Some(factor),
        })
        .collect();

    Ok(AllocationResult {
        rank: tier.rank,
        name: tier.name.clone(),
        required_total: tier.required_total,
        allocated_total: available,
        shortfall: tier.required_total.shortfall_from(available),
        pro_rata_factor: factor,
        is_underfunded: true,
        per_recipient,
    })
}

/// Give the truncation residual to the last recipient. If that would push it
/// above its own requirement, the excess walks back towards the front of the
/// tier, filling each recipient only up to its requirement.
fn distribute_residual(tier: &Tier, shares: &mut [i64], mut residual: i64) -> Result<()> {
    for (share, r) in shares.iter_mut().zip(&tier.recipients).rev() {
        if residual == 0 {
            break;
        }
        let headroom = r.required_amount.minor() - *share;
        let take = residual.min(headroom);
        *share += take;
        residual -= take;
    }
    if residual != 0 {
        return Err(reconciliation(tier.rank, "residual could not be placed"));
    }
    Ok(())
}

/// Re-check every output invariant; any failure aborts the run.
fn reconcile(pool: &Pool, results: &[AllocationResult]) -> Result<()> {
    let mut total = Money::ZERO;
    let mut required = Money::ZERO;
    for r in results {
        let recipients = Money::checked_sum(r.per_recipient.iter().map(|p| p.allocated))
            .ok_or_else(|| reconciliation(r.rank, "recipient sum overflow"))?;
        if recipients != r.allocated_total {
            return Err(reconciliation(
                r.rank,
                &format!(
                    "recipients sum to {} but tier allocated {}",
                    recipients, r.allocated_total
                ),
            ));
        }
        if r.allocated_total > r.required_total {
            return Err(reconciliation(r.rank, "allocated exceeds required"));
        }
        if r.per_recipient.iter().any(|p| p.allocated.is_negative() || p.allocated > p.required) {
            return Err(reconciliation(r.rank, "recipient allocation out of bounds"));
        }
        if r.shortfall != r.required_total.shortfall_from(r.allocated_total) {
            return Err(reconciliation(r.rank, "shortfall mismatch"));
        }
        total = total
            .checked_add(r.allocated_total)
            .ok_or_else(|| reconciliation(r.rank, "total overflow"))?;
        required = required
            .checked_add(r.required_total)
            .ok_or_else(|| reconciliation(r.rank, "required overflow"))?;
    }
    if total > pool.total_available {
        return Err(Error::RoundingReconciliation(format!(
            "allocated {} exceeds pool {}",
            total, pool.total_available
        )));
    }
    if pool.total_available <= required && total != pool.total_available {
        return Err(Error::RoundingReconciliation(format!(
            "allocated {} but pool {} should be fully used",
            total, pool.total_available
        )));
    }
    Ok(())
}

fn reconciliation(rank: u32, msg: &str) -> Error {
    Error::RoundingReconciliation(format!("tier {}: {}", rank, msg))
}

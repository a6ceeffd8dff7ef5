//! Full waterfall run: allocation, per-line statutory split and run totals.

use super::allocation::{AllocationResult, Pool};
use super::split::{StatutoryRate, StatutorySplit};
use crate::audit;
use crate::error::{Error, Result};
use crate::money::Money;
use crate::registry::{RecipientCategory, TierRegistry};
use serde::{Deserialize, Serialize};

/// One payment to one recipient, after the statutory carve-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisbursementLine {
    pub disbursement_id: String,
    pub rank: u32,
    pub recipient_id: String,
    pub category: RecipientCategory,
    pub split: StatutorySplit,
}

impl DisbursementLine {
    pub fn id_for(rank: u32, recipient_id: &str) -> String {
        format!("T{}:{}", rank, recipient_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterfallReport {
    pub pool: Money,
    pub total_required: Money,
    pub total_allocated: Money,
    /// Pool left over after every tier is fully funded.
    pub unallocated: Money,
    pub statutory_rate_bps: u16,
    pub statutory_total: Money,
    pub net_disbursed: Money,
    /// Pool Health Index: pool as a percentage of total requirement.
    pub pool_health_index: Option<f64>,
    pub tiers: Vec<AllocationResult>,
    pub disbursements: Vec<DisbursementLine>,
    /// SHA-256 of the report with this field empty.
    pub digest: String,
}

impl WaterfallReport {
    pub fn underfunded_tiers(&self) -> impl Iterator<Item = &AllocationResult> {
        self.tiers.iter().filter(|t| t.is_underfunded)
    }

    pub fn disbursement(&self, recipient_id: &str) -> Option<&DisbursementLine> {
        self.disbursements
            .iter()
            .find(|d| d.recipient_id == recipient_id)
    }

    /// Recompute the digest and compare.
    pub fn verify_digest(&self) -> bool {
        audit::report_digest(self) == self.digest
    }
}

/// `received / owed * 100`; `None` when nothing is owed.
pub fn pool_health_index(received: Money, owed: Money) -> Option<f64> {
    if owed.is_zero() || owed.is_negative() {
        return None;
    }
    Some(received.minor() as f64 / owed.minor() as f64 * 100.0)
}

/// Allocate `pool` across `registry`, split every non-zero recipient payment
/// and total the run.
pub fn run_waterfall(
    pool: &Pool,
    registry: &TierRegistry,
    rate: StatutoryRate,
) -> Result<WaterfallReport> {
    let tiers = registry.allocate(pool)?;
    let total_required = registry.total_required()?;

    let mut disbursements = Vec::new();
    for result in &tiers {
        for alloc in result.per_recipient.iter().filter(|a| !a.allocated.is_zero()) {
            let (_, recipient) = registry.recipient(&alloc.recipient_id).ok_or_else(|| {
                Error::RoundingReconciliation(format!(
                    "Allocated recipient {} missing from registry",
                    alloc.recipient_id
                ))
            })?;
            let id = DisbursementLine::id_for(result.rank, &alloc.recipient_id);
            let split = rate.apply(&id, alloc.allocated)?;
            disbursements.push(DisbursementLine {
                disbursement_id: id,
                rank: result.rank,
                recipient_id: alloc.recipient_id.clone(),
                category: recipient.category,
                split,
            });
        }
    }

    let overflow = || Error::RoundingReconciliation("Run totals overflow".to_string());
    let total_allocated =
        Money::checked_sum(tiers.iter().map(|t| t.allocated_total)).ok_or_else(overflow)?;
    let statutory_total = Money::checked_sum(disbursements.iter().map(|d| d.split.statutory_share))
        .ok_or_else(overflow)?;
    let net_disbursed = Money::checked_sum(disbursements.iter().map(|d| d.split.recipient_share))
        .ok_or_else(overflow)?;
    let unallocated = pool
        .total_available
        .checked_sub(total_allocated)
        .filter(|m| !m.is_negative())
        .ok_or_else(|| {
            Error::RoundingReconciliation(format!(
                "Allocated {} exceeds pool {}",
                total_allocated, pool.total_available
            ))
        })?;
    if net_disbursed.checked_add(statutory_total) != Some(total_allocated) {
        return Err(Error::RoundingReconciliation(format!(
            "Net {} + statutory {} != allocated {}",
            net_disbursed, statutory_total, total_allocated
        )));
    }

    let mut report = WaterfallReport {
        pool: pool.total_available,
        total_required,
        total_allocated,
        unallocated,
        statutory_rate_bps: rate.bps(),
        statutory_total,
        net_disbursed,
        pool_health_index: pool_health_index(pool.total_available, total_required),
        tiers,
        disbursements,
        digest: String::new(),
    };
    report.digest = audit::report_digest(&report);

    log::info!(
        "Waterfall run: pool {}, required {}, allocated {}, statutory {}, {} underfunded tier(s)",
        report.pool,
        report.total_required,
        report.total_allocated,
        report.statutory_total,
        report.underfunded_tiers().count()
    );
    Ok(report)
}

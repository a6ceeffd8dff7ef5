//! Statutory split: a fixed percentage carve-out from every disbursement line
//! to the regulator, expressed in basis points.

use crate::error::{Error, Result};
use crate::money::Money;
use serde::{Deserialize, Serialize};

pub const BPS_MAX: u16 = 10_000;

/// SERC statutory deduction: 5% of every disbursement line.
pub const SERC_STATUTORY_RATE_BPS: u16 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatutoryRate {
    bps: u16,
}

impl StatutoryRate {
    /// Rate in basis points; must lie in `0..=10_000`.
    pub fn from_bps(bps: i64) -> Result<Self> {
        if bps < 0 {
            return Err(Error::Config(format!(
                "Statutory rate must not be negative, got {} bps",
                bps
            )));
        }
        if bps > i64::from(BPS_MAX) {
            return Err(Error::Config(format!(
                "Statutory rate {} bps exceeds {} bps",
                bps, BPS_MAX
            )));
        }
        Ok(StatutoryRate { bps: bps as u16 })
    }

    pub fn serc() -> Self {
        StatutoryRate {
            bps: SERC_STATUTORY_RATE_BPS,
        }
    }

    pub fn bps(&self) -> u16 {
        self.bps
    }

    /// Rate as a fraction, for display.
    pub fn as_fraction(&self) -> f64 {
        f64::from(self.bps) / f64::from(BPS_MAX)
    }

    /// Split one disbursement line. The statutory share is rounded half-up;
    /// the recipient share is the exact remainder.
    pub fn apply(&self, disbursement_id: &str, gross_amount: Money) -> Result<StatutorySplit> {
        if gross_amount.is_negative() {
            return Err(Error::Config(format!(
                "Disbursement {} has negative gross amount {}",
                disbursement_id, gross_amount
            )));
        }
        let scaled = i128::from(gross_amount.minor()) * i128::from(self.bps);
        let half = i128::from(BPS_MAX / 2);
        let statutory = (scaled + half) / i128::from(BPS_MAX);
        let statutory_share = i64::try_from(statutory).map(Money::from_minor).map_err(|_| {
            Error::RoundingReconciliation(format!(
                "Statutory share overflow for {}",
                disbursement_id
            ))
        })?;
        let recipient_share = gross_amount.checked_sub(statutory_share).ok_or_else(|| {
            Error::RoundingReconciliation(format!(
                "Recipient share underflow for {}",
                disbursement_id
            ))
        })?;

        let split = StatutorySplit {
            disbursement_id: disbursement_id.to_string(),
            gross_amount,
            recipient_share,
            statutory_share,
        };
        split.verify()?;
        Ok(split)
    }
}

impl Default for StatutoryRate {
    fn default() -> Self {
        StatutoryRate::serc()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatutorySplit {
    pub disbursement_id: String,
    pub gross_amount: Money,
    pub recipient_share: Money,
    pub statutory_share: Money,
}

impl StatutorySplit {
    /// `recipient_share + statutory_share == gross_amount`, both non-negative.
    pub fn verify(&self) -> Result<()> {
        let sum = self.recipient_share.checked_add(self.statutory_share);
        if sum != Some(self.gross_amount)
            || self.recipient_share.is_negative()
            || self.statutory_share.is_negative()
        {
            return Err(Error::RoundingReconciliation(format!(
                "Split {} does not reconcile: {} + {} != {}",
                self.disbursement_id, self.recipient_share, self.statutory_share, self.gross_amount
            )));
        }
        Ok(())
    }
}

/// Split with the default SERC rate.
pub fn apply_split(gross_amount: Money) -> Result<StatutorySplit> {
    StatutoryRate::serc().apply("", gross_amount)
}

use crate::error::{Error, Result};
use crate::money::Money;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Market participant category of a waterfall recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecipientCategory {
    /// Distribution company
    Disco,
    /// Generation company
    Genco,
    /// Market service provider (operator, transmission, trader)
    ServiceProvider,
    /// State electricity regulatory commission
    Serc,
    /// Bilateral contract counterparty
    Bilateral,
}

impl RecipientCategory {
    /// All categories in stable order
    pub const ALL: &'static [RecipientCategory] = &[
        RecipientCategory::Disco,
        RecipientCategory::Genco,
        RecipientCategory::ServiceProvider,
        RecipientCategory::Serc,
        RecipientCategory::Bilateral,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            RecipientCategory::Disco => "Distribution Company",
            RecipientCategory::Genco => "Generation Company",
            RecipientCategory::ServiceProvider => "Service Provider",
            RecipientCategory::Serc => "State Regulatory Commission",
            RecipientCategory::Bilateral => "Bilateral Counterparty",
        }
    }

    /// True for the regulator that receives statutory carve-outs.
    pub fn is_statutory(&self) -> bool {
        match self {
            RecipientCategory::Serc => true,
            RecipientCategory::Disco
            | RecipientCategory::Genco
            | RecipientCategory::ServiceProvider
            | RecipientCategory::Bilateral => false,
        }
    }
}

impl fmt::Display for RecipientCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A payee inside one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: String,
    pub display_name: String,
    pub category: RecipientCategory,
    pub required_amount: Money,
}

impl Recipient {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        category: RecipientCategory,
        required_amount: Money,
    ) -> Self {
        Recipient {
            id: id.into(),
            display_name: display_name.into(),
            category,
            required_amount,
        }
    }
}

/// Priority tier. Lower rank is paid first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub rank: u32,
    pub name: String,
    pub recipients: Vec<Recipient>,
    /// Always the sum of `recipients[*].required_amount`.
    pub required_total: Money,
}

impl Tier {
    /// Build a tier, deriving `required_total` from the members.
    pub fn new(rank: u32, name: impl Into<String>, recipients: Vec<Recipient>) -> Result<Self> {
        let name = name.into();
        let required_total = sum_required(rank, &recipients)?;
        let tier = Tier {
            rank,
            name,
            recipients,
            required_total,
        };
        tier.validate()?;
        Ok(tier)
    }

    /// Check this tier in isolation: rank, amounts and declared total.
    pub fn validate(&self) -> Result<()> {
        if self.rank == 0 {
            return Err(Error::Config(format!(
                "Tier '{}' has rank 0; ranks start at 1",
                self.name
            )));
        }
        for r in &self.recipients {
            if r.id.trim().is_empty() {
                return Err(Error::Config(format!(
                    "Tier {} has a recipient with an empty id",
                    self.rank
                )));
            }
            if r.required_amount.is_negative() {
                return Err(Error::Config(format!(
                    "Recipient {} in tier {} has negative required amount {}",
                    r.id, self.rank, r.required_amount
                )));
            }
        }
        if self.required_total.is_negative() {
            return Err(Error::Config(format!(
                "Tier {} has negative required total {}",
                self.rank, self.required_total
            )));
        }
        let members = sum_required(self.rank, &self.recipients)?;
        if members != self.required_total {
            return Err(Error::Config(format!(
                "Tier {} declares required total {} but recipients sum to {}",
                self.rank, self.required_total, members
            )));
        }
        Ok(())
    }

    pub fn recipient(&self, id: &str) -> Option<&Recipient> {
        self.recipients.iter().find(|r| r.id == id)
    }
}

fn sum_required(rank: u32, recipients: &[Recipient]) -> Result<Money> {
    Money::checked_sum(recipients.iter().map(|r| r.required_amount)).ok_or_else(|| {
        Error::Config(format!("Tier {} required amounts overflow", rank))
    })
}

/// Validate a tier list as a whole: every tier individually, unique ranks,
/// each recipient id appearing in exactly one tier, and a combined
/// requirement that fits in `Money`.
pub fn validate_tiers(tiers: &[Tier]) -> Result<()> {
    let mut ranks = HashSet::new();
    let mut recipient_ids = HashSet::new();
    for tier in tiers {
        tier.validate()?;
        if !ranks.insert(tier.rank) {
            return Err(Error::Config(format!("Duplicate tier rank {}", tier.rank)));
        }
        for r in &tier.recipients {
            if !recipient_ids.insert(r.id.as_str()) {
                return Err(Error::Config(format!(
                    "Recipient {} appears in more than one tier",
                    r.id
                )));
            }
        }
    }
    if Money::checked_sum(tiers.iter().map(|t| t.required_total)).is_none() {
        return Err(Error::Config("Combined tier requirements overflow".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disco(id: &str, amount: i64) -> Recipient {
        Recipient::new(id, id, RecipientCategory::Disco, Money::from_minor(amount))
    }

    #[test]
    fn test_tier_derives_required_total() {
        let tier = Tier::new(1, "Market Operator", vec![disco("A", 400), disco("B", 200)]).unwrap();
        assert_eq!(tier.required_total, Money::from_minor(600));
        assert_eq!(tier.recipient("B").unwrap().required_amount, Money::from_minor(200));
    }

    #[test]
    fn test_tier_rejects_rank_zero_and_negative_amounts() {
        assert!(matches!(Tier::new(0, "bad", vec![]), Err(Error::Config(_))));
        assert!(matches!(
            Tier::new(1, "bad", vec![disco("A", -5)]),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_validate_catches_total_mismatch() {
        let mut tier = Tier::new(1, "T1", vec![disco("A", 100)]).unwrap();
        tier.required_total = Money::from_minor(99);
        assert!(matches!(tier.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_tiers_duplicates() {
        let t1 = Tier::new(1, "T1", vec![disco("A", 100)]).unwrap();
        let t1b = Tier::new(1, "T1b", vec![disco("B", 100)]).unwrap();
        let err = validate_tiers(&[t1.clone(), t1b]).unwrap_err();
        assert_eq!(err, Error::Config("Duplicate tier rank 1".to_string()));

        let t2 = Tier::new(2, "T2", vec![disco("A", 50)]).unwrap();
        assert!(matches!(validate_tiers(&[t1, t2]), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_tiers_combined_overflow() {
        let half = i64::MAX / 2 + 1;
        let t1 = Tier::new(1, "T1", vec![disco("A", half)]).unwrap();
        let t2 = Tier::new(2, "T2", vec![disco("B", half)]).unwrap();
        assert_eq!(
            validate_tiers(&[t1, t2]).unwrap_err(),
            Error::Config("Combined tier requirements overflow".to_string())
        );
    }

    #[test]
    fn test_category_serde_names() {
        let json = serde_json::to_string(&RecipientCategory::ServiceProvider).unwrap();
        assert_eq!(json, "\"SERVICE_PROVIDER\"");
        let back: RecipientCategory = serde_json::from_str("\"SERC\"").unwrap();
        assert!(back.is_statutory());
        assert_eq!(
            RecipientCategory::ALL.iter().filter(|c| c.is_statutory()).count(),
            1
        );
    }
}

use crate::error::{Error, Result};
use crate::money::Money;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Collection line status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionStatus {
    /// Payment reported, not yet checked.
    Pending,
    /// Amount confirmed against the remittance.
    Verified,
    /// Booked to the ledger.
    Posted,
    /// Matched against the bank statement.
    Reconciled,
    /// Amount contested by a party.
    Disputed,
}

impl CollectionStatus {
    /// Rollup urgency; lower wins. Pending, then Disputed, then the settled
    /// states from least to most advanced.
    pub fn urgency(&self) -> u8 {
        match self {
            CollectionStatus::Pending => 0,
            CollectionStatus::Disputed => 1,
            CollectionStatus::Verified => 2,
            CollectionStatus::Posted => 3,
            CollectionStatus::Reconciled => 4,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            CollectionStatus::Verified | CollectionStatus::Posted | CollectionStatus::Reconciled
        )
    }

    /// The more urgent of two statuses.
    pub fn worst(self, other: CollectionStatus) -> CollectionStatus {
        if other.urgency() < self.urgency() {
            other
        } else {
            self
        }
    }
}

/// Settlement period: one calendar month, written `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    year: u16,
    month: u8,
}

impl Period {
    pub fn new(year: u16, month: u8) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(Error::Input(format!("Invalid period month {}", month)));
        }
        Ok(Period { year, month })
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || Error::Input(format!("Invalid period '{}', expected YYYY-MM", s));
        let (y, m) = s.trim().split_once('-').ok_or_else(bad)?;
        if y.len() != 4 || m.len() != 2 {
            return Err(bad());
        }
        let year = y.parse::<u16>().map_err(|_| bad())?;
        let month = m.parse::<u8>().map_err(|_| bad())?;
        Period::new(year, month).map_err(|_| bad())
    }
}

impl TryFrom<String> for Period {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Period> for String {
    fn from(p: Period) -> String {
        p.to_string()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// One raw payment line received from a market participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub entity_id: String,
    pub period: Period,
    pub charge_code: String,
    pub service_provider_id: String,
    pub amount: Money,
    pub status: CollectionStatus,
    pub audit_locked: bool,
}

impl CollectionEntry {
    pub fn new(
        entity_id: impl Into<String>,
        period: Period,
        charge_code: impl Into<String>,
        service_provider_id: impl Into<String>,
        amount: Money,
        status: CollectionStatus,
    ) -> Self {
        CollectionEntry {
            entity_id: entity_id.into(),
            period,
            charge_code: charge_code.into(),
            service_provider_id: service_provider_id.into(),
            amount,
            status,
            audit_locked: false,
        }
    }

    pub fn locked(mut self) -> Self {
        self.audit_locked = true;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.entity_id.trim().is_empty() {
            return Err(Error::Input("Collection entry has empty entity_id".to_string()));
        }
        if self.charge_code.trim().is_empty() {
            return Err(Error::Input(format!(
                "Collection entry for {} has empty charge_code",
                self.entity_id
            )));
        }
        if self.amount.is_negative() {
            return Err(Error::Input(format!(
                "Collection entry {}/{}/{} has negative amount {}",
                self.entity_id, self.period, self.charge_code, self.amount
            )));
        }
        Ok(())
    }
}

/// Loosely-typed entry as it arrives in JSON; every field may be absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCollectionEntry {
    pub entity_id: Option<String>,
    pub period: Option<String>,
    pub charge_code: Option<String>,
    pub service_provider_id: Option<String>,
    pub amount: Option<Money>,
    pub status: Option<CollectionStatus>,
    #[serde(default)]
    pub audit_locked: bool,
}

impl TryFrom<RawCollectionEntry> for CollectionEntry {
    type Error = Error;

    fn try_from(raw: RawCollectionEntry) -> Result<Self> {
        fn required<T>(field: Option<T>, name: &str) -> Result<T> {
            field.ok_or_else(|| Error::Input(format!("Collection entry missing {}", name)))
        }
        let entry = CollectionEntry {
            entity_id: required(raw.entity_id, "entity_id")?,
            period: required(raw.period, "period")?.parse()?,
            charge_code: required(raw.charge_code, "charge_code")?,
            service_provider_id: raw.service_provider_id.unwrap_or_default(),
            amount: required(raw.amount, "amount")?,
            status: required(raw.status, "status")?,
            audit_locked: raw.audit_locked,
        };
        entry.validate()?;
        Ok(entry)
    }
}

/// Parse a JSON array of entries, rejecting the whole batch on the first
/// malformed one.
pub fn parse_entries(json: &str) -> Result<Vec<CollectionEntry>> {
    let raw: Vec<RawCollectionEntry> = serde_json::from_str(json)
        .map_err(|e| Error::Input(format!("Failed to parse collection entries: {}", e)))?;
    raw.into_iter()
        .enumerate()
        .map(|(i, r)| {
            CollectionEntry::try_from(r).map_err(|e| match e {
                Error::Input(msg) => Error::Input(format!("entry {}: {}", i, msg)),
                other => other,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_worst() {
        use CollectionStatus::*;
        assert_eq!(Verified.worst(Pending), Pending);
        assert_eq!(Disputed.worst(Reconciled), Disputed);
        assert_eq!(Reconciled.worst(Posted), Posted);
        assert_eq!(Posted.worst(Verified), Verified);
        assert!(!Disputed.is_settled());
    }

    #[test]
    fn test_period_parse_and_display() {
        let p: Period = "2025-01".parse().unwrap();
        assert_eq!((p.year(), p.month()), (2025, 1));
        assert_eq!(p.to_string(), "2025-01");
        assert!("2025-13".parse::<Period>().is_err());
        assert!("2025/01".parse::<Period>().is_err());
        assert!("25-01".parse::<Period>().is_err());
        assert!(Period::new(2024, 12).unwrap() < Period::new(2025, 1).unwrap());
    }

    #[test]
    fn test_parse_entries() {
        let json = r#"[
            {"entity_id": "E1", "period": "2025-01", "charge_code": "ENERGY",
             "service_provider_id": "MO", "amount": 300000, "status": "pending"},
            {"entity_id": "E1", "period": "2025-01", "charge_code": "CAPACITY",
             "amount": 200000, "status": "verified", "audit_locked": true}
        ]"#;
        let entries = parse_entries(json).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].status, CollectionStatus::Pending);
        assert!(entries[1].audit_locked);
        assert_eq!(entries[1].service_provider_id, "");
    }

    #[test]
    fn test_parse_entries_missing_field() {
        let json = r#"[{"entity_id": "E1", "period": "2025-01", "amount": 1, "status": "posted"}]"#;
        let err = parse_entries(json).unwrap_err();
        assert_eq!(
            err,
            Error::Input("entry 0: Collection entry missing charge_code".to_string())
        );
    }

    #[test]
    fn test_negative_amount_rejected() {
        let entry = CollectionEntry::new(
            "E1",
            Period::new(2025, 1).unwrap(),
            "ENERGY",
            "MO",
            Money::from_minor(-1),
            CollectionStatus::Posted,
        );
        assert!(matches!(entry.validate(), Err(Error::Input(_))));
    }
}

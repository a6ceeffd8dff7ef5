//! Append-only collection ledger.
//!
//! Entries are only ever appended. An entry may be amended in place while it
//! is unlocked; once audit-locked it is frozen for good.

use super::aggregate::{aggregate, AggregatedCollection};
use super::entry::{CollectionEntry, Period};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of an entry in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionLedger {
    entries: Vec<CollectionEntry>,
}

impl CollectionLedger {
    pub fn new() -> Self {
        CollectionLedger::default()
    }

    pub fn append(&mut self, entry: CollectionEntry) -> Result<EntryId> {
        entry.validate()?;
        let id = EntryId(self.entries.len() as u64);
        log::debug!(
            "Ledger append {}: {}/{}/{} {}",
            id,
            entry.entity_id,
            entry.period,
            entry.charge_code,
            entry.amount
        );
        self.entries.push(entry);
        Ok(id)
    }

    pub fn get(&self, id: EntryId) -> Option<&CollectionEntry> {
        self.entries.get(id.0 as usize)
    }

    fn get_mut(&mut self, id: EntryId) -> Result<&mut CollectionEntry> {
        self.entries
            .get_mut(id.0 as usize)
            .ok_or_else(|| Error::Input(format!("Collection entry {} not found", id)))
    }

    /// Replace an unlocked entry. The replacement must keep the same entity
    /// and period; it may itself be locked.
    pub fn amend(&mut self, id: EntryId, replacement: CollectionEntry) -> Result<()> {
        replacement.validate()?;
        let current = self.get_mut(id)?;
        if current.audit_locked {
            return Err(locked_error(current));
        }
        if current.entity_id != replacement.entity_id || current.period != replacement.period {
            return Err(Error::Input(format!(
                "Amendment of {} may not move it from {}/{} to {}/{}",
                id, current.entity_id, current.period, replacement.entity_id, replacement.period
            )));
        }
        *current = replacement;
        Ok(())
    }

    /// Lock one entry. Locking an already locked entry is a no-op.
    pub fn lock(&mut self, id: EntryId) -> Result<()> {
        self.get_mut(id)?.audit_locked = true;
        Ok(())
    }

    /// Lock every entry for an entity and period; returns how many changed.
    pub fn lock_period(&mut self, entity_id: &str, period: Period) -> usize {
        let mut changed = 0;
        for e in self
            .entries
            .iter_mut()
            .filter(|e| e.entity_id == entity_id && e.period == period && !e.audit_locked)
        {
            e.audit_locked = true;
            changed += 1;
        }
        log::info!("Locked {} entries for {}/{}", changed, entity_id, period);
        changed
    }

    pub fn entries(&self) -> &[CollectionEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn aggregate(&self) -> Result<Vec<AggregatedCollection>> {
        aggregate(&self.entries)
    }
}

fn locked_error(entry: &CollectionEntry) -> Error {
    Error::AuditLocked {
        entity_id: entry.entity_id.clone(),
        period: entry.period.to_string(),
        charge_code: entry.charge_code.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::CollectionStatus;
    use crate::money::Money;

    fn entry(amount: i64) -> CollectionEntry {
        CollectionEntry::new(
            "E1",
            Period::new(2025, 1).unwrap(),
            "ENERGY",
            "MO",
            Money::from_minor(amount),
            CollectionStatus::Pending,
        )
    }

    #[test]
    fn test_append_and_get() {
        let mut ledger = CollectionLedger::new();
        let a = ledger.append(entry(10)).unwrap();
        let b = ledger.append(entry(20)).unwrap();
        assert_eq!((a, b), (EntryId(0), EntryId(1)));
        assert_eq!(ledger.get(b).unwrap().amount, Money::from_minor(20));
        assert_eq!(ledger.len(), 2);
        assert!(ledger.get(EntryId(5)).is_none());
    }

    #[test]
    fn test_amend_unlocked_entry() {
        let mut ledger = CollectionLedger::new();
        let id = ledger.append(entry(10)).unwrap();
        let mut fixed = entry(15);
        fixed.status = CollectionStatus::Verified;
        ledger.amend(id, fixed).unwrap();
        assert_eq!(ledger.get(id).unwrap().amount, Money::from_minor(15));
    }

    #[test]
    fn test_locked_entry_is_frozen() {
        let mut ledger = CollectionLedger::new();
        let id = ledger.append(entry(10)).unwrap();
        ledger.lock(id).unwrap();
        let err = ledger.amend(id, entry(99)).unwrap_err();
        assert_eq!(
            err,
            Error::AuditLocked {
                entity_id: "E1".to_string(),
                period: "2025-01".to_string(),
                charge_code: "ENERGY".to_string(),
            }
        );
        assert_eq!(ledger.get(id).unwrap().amount, Money::from_minor(10));
    }

    #[test]
    fn test_amend_cannot_regroup() {
        let mut ledger = CollectionLedger::new();
        let id = ledger.append(entry(10)).unwrap();
        let mut moved = entry(10);
        moved.entity_id = "E2".to_string();
        assert!(matches!(ledger.amend(id, moved), Err(Error::Input(_))));
    }

    #[test]
    fn test_lock_period_and_aggregate() {
        let mut ledger = CollectionLedger::new();
        ledger.append(entry(10)).unwrap();
        ledger.append(entry(20)).unwrap();
        let mut other = entry(5);
        other.entity_id = "E2".to_string();
        ledger.append(other).unwrap();

        assert_eq!(ledger.lock_period("E1", Period::new(2025, 1).unwrap()), 2);
        assert_eq!(ledger.lock_period("E1", Period::new(2025, 1).unwrap()), 0);

        let agg = ledger.aggregate().unwrap();
        assert_eq!(agg.len(), 2);
        assert!(agg[0].audit_locked);
        assert_eq!(agg[0].total_amount, Money::from_minor(30));
        assert!(!agg[1].audit_locked);
    }
}

use super::entry::{CollectionEntry, CollectionStatus, Period};
use crate::error::{Error, Result};
use crate::money::Money;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-entity, per-period rollup of collection entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedCollection {
    pub entity_id: String,
    pub period: Period,
    pub total_amount: Money,
    pub overall_status: CollectionStatus,
    /// True only if every member entry is locked.
    pub audit_locked: bool,
    pub entry_count: usize,
    pub by_charge_code: BTreeMap<String, Money>,
}

impl AggregatedCollection {
    fn start(entry: &CollectionEntry) -> Self {
        AggregatedCollection {
            entity_id: entry.entity_id.clone(),
            period: entry.period,
            total_amount: Money::ZERO,
            overall_status: entry.status,
            audit_locked: true,
            entry_count: 0,
            by_charge_code: BTreeMap::new(),
        }
    }

    fn absorb(&mut self, entry: &CollectionEntry) -> Result<()> {
        let overflow = || {
            Error::Input(format!(
                "Collection total overflow for {}/{}",
                entry.entity_id, entry.period
            ))
        };
        self.total_amount = self.total_amount.checked_add(entry.amount).ok_or_else(overflow)?;
        let line = self
            .by_charge_code
            .entry(entry.charge_code.clone())
            .or_insert(Money::ZERO);
        *line = line.checked_add(entry.amount).ok_or_else(overflow)?;
        self.overall_status = self.overall_status.worst(entry.status);
        self.audit_locked &= entry.audit_locked;
        self.entry_count += 1;
        Ok(())
    }
}

/// Group entries by `(entity_id, period)`.
///
/// Output is sorted by entity then period, and is independent of input order.
pub fn aggregate(entries: &[CollectionEntry]) -> Result<Vec<AggregatedCollection>> {
    let mut groups: BTreeMap<(String, Period), AggregatedCollection> = BTreeMap::new();
    for entry in entries {
        entry.validate()?;
        groups
            .entry((entry.entity_id.clone(), entry.period))
            .or_insert_with(|| AggregatedCollection::start(entry))
            .absorb(entry)?;
    }
    log::debug!(
        "Aggregated {} collection entries into {} groups",
        entries.len(),
        groups.len()
    );
    Ok(groups.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(entity: &str, period: &str, code: &str, amount: i64, status: CollectionStatus) -> CollectionEntry {
        CollectionEntry::new(
            entity,
            period.parse().unwrap(),
            code,
            "MO",
            Money::from_minor(amount),
            status,
        )
    }

    #[test]
    fn test_pending_dominates_and_unlocked_wins() {
        let entries = vec![
            entry("E1", "2025-01", "ENERGY", 300_000, CollectionStatus::Pending),
            entry("E1", "2025-01", "CAPACITY", 200_000, CollectionStatus::Verified).locked(),
        ];
        let out = aggregate(&entries).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].total_amount, Money::from_minor(500_000));
        assert_eq!(out[0].overall_status, CollectionStatus::Pending);
        assert!(!out[0].audit_locked);
        assert_eq!(out[0].entry_count, 2);
        assert_eq!(out[0].by_charge_code["ENERGY"], Money::from_minor(300_000));
    }

    #[test]
    fn test_disputed_beats_settled() {
        let entries = vec![
            entry("E1", "2025-02", "ENERGY", 1, CollectionStatus::Reconciled).locked(),
            entry("E1", "2025-02", "ENERGY", 2, CollectionStatus::Disputed).locked(),
        ];
        let out = aggregate(&entries).unwrap();
        assert_eq!(out[0].overall_status, CollectionStatus::Disputed);
        assert!(out[0].audit_locked);
        assert_eq!(out[0].by_charge_code["ENERGY"], Money::from_minor(3));
    }

    #[test]
    fn test_settled_reports_least_advanced() {
        let entries = vec![
            entry("E1", "2025-03", "A", 1, CollectionStatus::Reconciled),
            entry("E1", "2025-03", "B", 1, CollectionStatus::Posted),
        ];
        assert_eq!(aggregate(&entries).unwrap()[0].overall_status, CollectionStatus::Posted);
    }

    #[test]
    fn test_groups_sorted_by_entity_then_period() {
        let entries = vec![
            entry("E2", "2025-01", "A", 5, CollectionStatus::Posted),
            entry("E1", "2025-02", "A", 5, CollectionStatus::Posted),
            entry("E1", "2024-12", "A", 5, CollectionStatus::Posted),
        ];
        let keys: Vec<(String, String)> = aggregate(&entries)
            .unwrap()
            .into_iter()
            .map(|a| (a.entity_id, a.period.to_string()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("E1".to_string(), "2024-12".to_string()),
                ("E1".to_string(), "2025-02".to_string()),
                ("E2".to_string(), "2025-01".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_entry_rejected() {
        let entries = vec![entry("", "2025-01", "A", 5, CollectionStatus::Posted)];
        assert!(matches!(aggregate(&entries), Err(Error::Input(_))));
    }
}

//! Versioned tier registries published under maker-checker control.
//!
//! A registry change is proposed by a maker as a Draft and only becomes the
//! active snapshot once a different checker approves it. Published registries
//! are handed out as `Arc` snapshots; publishing a new version swaps the
//! pointer and never touches a snapshot an in-flight run already holds.

use super::TierRegistry;
use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RegistryVersionStatus {
    Draft,
    Published,
    Superseded,
    Rejected,
}

#[derive(Debug, Clone)]
pub struct RegistryVersion {
    pub version: u64,
    pub maker: String,
    pub checker: Option<String>,
    pub status: RegistryVersionStatus,
    pub registry: Arc<TierRegistry>,
}

impl RegistryVersion {
    pub fn is_published(&self) -> bool {
        self.status == RegistryVersionStatus::Published
    }

    pub fn is_draft(&self) -> bool {
        self.status == RegistryVersionStatus::Draft
    }
}

/// Store of registry versions; at most one version is Published at a time.
#[derive(Debug, Default)]
pub struct RegistryStore {
    versions: BTreeMap<u64, RegistryVersion>,
    active: Option<u64>,
}

impl RegistryStore {
    pub fn new() -> Self {
        RegistryStore::default()
    }

    /// Record a Draft version; returns its version number.
    pub fn propose(&mut self, maker: &str, registry: TierRegistry) -> Result<u64> {
        if maker.trim().is_empty() {
            return Err(Error::Approval("Maker identity is required".to_string()));
        }
        let version = self.versions.keys().next_back().map_or(1, |v| v + 1);
        self.versions.insert(
            version,
            RegistryVersion {
                version,
                maker: maker.to_string(),
                checker: None,
                status: RegistryVersionStatus::Draft,
                registry: Arc::new(registry),
            },
        );
        log::info!("Registry version {} proposed by {}", version, maker);
        Ok(version)
    }

    /// Publish a Draft. The checker must differ from the maker.
    pub fn approve(&mut self, version: u64, checker: &str) -> Result<Arc<TierRegistry>> {
        let draft = self.draft_for_review(version, checker)?;
        draft.checker = Some(checker.to_string());
        draft.status = RegistryVersionStatus::Published;
        let published = Arc::clone(&draft.registry);

        if let Some(prev) = self.active.replace(version) {
            if let Some(old) = self.versions.get_mut(&prev) {
                old.status = RegistryVersionStatus::Superseded;
            }
        }
        log::info!("Registry version {} approved by {}", version, checker);
        Ok(published)
    }

    /// Reject a Draft. Same distinct-checker rule as approval.
    pub fn reject(&mut self, version: u64, checker: &str) -> Result<()> {
        let draft = self.draft_for_review(version, checker)?;
        draft.checker = Some(checker.to_string());
        draft.status = RegistryVersionStatus::Rejected;
        log::info!("Registry version {} rejected by {}", version, checker);
        Ok(())
    }

    fn draft_for_review(&mut self, version: u64, checker: &str) -> Result<&mut RegistryVersion> {
        let entry = self
            .versions
            .get_mut(&version)
            .ok_or_else(|| Error::Approval(format!("Registry version {} not found", version)))?;
        if !entry.is_draft() {
            return Err(Error::Approval(format!(
                "Registry version {} is {:?}, not Draft",
                version, entry.status
            )));
        }
        if checker.trim().is_empty() {
            return Err(Error::Approval("Checker identity is required".to_string()));
        }
        if entry.maker == checker {
            return Err(Error::Approval(format!(
                "Checker {} cannot approve their own change (version {})",
                checker, version
            )));
        }
        Ok(entry)
    }

    /// Snapshot of the currently published registry.
    pub fn active(&self) -> Option<Arc<TierRegistry>> {
        self.active
            .and_then(|v| self.versions.get(&v))
            .map(|pv| Arc::clone(&pv.registry))
    }

    pub fn active_version(&self) -> Option<u64> {
        self.active
    }

    pub fn get(&self, version: u64) -> Option<&RegistryVersion> {
        self.versions.get(&version)
    }

    pub fn versions(&self) -> impl Iterator<Item = &RegistryVersion> {
        self.versions.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::registry::{Recipient, RecipientCategory, Tier};

    fn registry(amount: i64) -> TierRegistry {
        let tier = Tier::new(
            1,
            "Operations",
            vec![Recipient::new(
                "MO",
                "Market Operator",
                RecipientCategory::ServiceProvider,
                Money::from_minor(amount),
            )],
        )
        .unwrap();
        TierRegistry::new(vec![tier]).unwrap()
    }

    #[test]
    fn test_maker_cannot_approve_own_change() {
        let mut store = RegistryStore::new();
        let v = store.propose("ada", registry(100)).unwrap();
        assert!(matches!(store.approve(v, "ada"), Err(Error::Approval(_))));
        assert!(store.active().is_none());
        assert!(store.get(v).unwrap().is_draft());
    }

    #[test]
    fn test_approve_publishes_and_supersedes() {
        let mut store = RegistryStore::new();
        let v1 = store.propose("ada", registry(100)).unwrap();
        store.approve(v1, "bola").unwrap();
        let before = store.active().unwrap();

        let v2 = store.propose("ada", registry(200)).unwrap();
        store.approve(v2, "chidi").unwrap();

        assert_eq!(store.active_version(), Some(v2));
        assert_eq!(store.get(v1).unwrap().status, RegistryVersionStatus::Superseded);
        assert!(store.get(v2).unwrap().is_published());
        // Snapshot taken before the swap still sees the old requirement.
        assert_eq!(before.tiers()[0].required_total, Money::from_minor(100));
        assert_eq!(
            store.active().unwrap().tiers()[0].required_total,
            Money::from_minor(200)
        );
    }

    #[test]
    fn test_only_drafts_can_be_reviewed() {
        let mut store = RegistryStore::new();
        let v = store.propose("ada", registry(100)).unwrap();
        store.reject(v, "bola").unwrap();
        assert_eq!(store.get(v).unwrap().status, RegistryVersionStatus::Rejected);
        assert!(matches!(store.approve(v, "chidi"), Err(Error::Approval(_))));
        assert!(matches!(store.approve(99, "chidi"), Err(Error::Approval(_))));
    }
}

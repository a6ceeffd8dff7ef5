pub mod tier;
pub mod version;

pub use tier::{validate_tiers, Recipient, RecipientCategory, Tier};
pub use version::{RegistryStore, RegistryVersion, RegistryVersionStatus};

use crate::engine::allocation::{allocate, AllocationResult, Pool};
use crate::error::{Error, Result};
use crate::money::Money;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// On-disk shape of one tier. Ranks are signed here so that a negative rank
/// in a file is reported rather than failing to parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierConfig {
    pub rank: i64,
    pub name: String,
    pub recipients: Vec<Recipient>,
    /// Optional cross-check against the recipient sum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_total: Option<Money>,
}

/// On-disk shape of a tier registry file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub tiers: Vec<TierConfig>,
}

/// Validated, rank-ordered set of tiers.
///
/// Construction is the only place validation happens; a `TierRegistry` value
/// is immutable afterwards and is shared between runs as `Arc<TierRegistry>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierRegistry {
    tiers: Vec<Tier>,
}

impl TierRegistry {
    pub fn new(mut tiers: Vec<Tier>) -> Result<Self> {
        validate_tiers(&tiers)?;
        tiers.sort_by_key(|t| t.rank);
        Ok(TierRegistry { tiers })
    }

    pub fn from_config(config: RegistryConfig) -> Result<Self> {
        let mut tiers = Vec::with_capacity(config.tiers.len());
        for tc in config.tiers {
            let rank = u32::try_from(tc.rank)
                .ok()
                .filter(|r| *r >= 1)
                .ok_or_else(|| {
                    Error::Config(format!("Tier '{}' has invalid rank {}", tc.name, tc.rank))
                })?;
            let tier = Tier::new(rank, tc.name, tc.recipients)?;
            if let Some(declared) = tc.required_total {
                if declared != tier.required_total {
                    return Err(Error::Config(format!(
                        "Tier {} declares required total {} but recipients sum to {}",
                        tier.rank, declared, tier.required_total
                    )));
                }
            }
            tiers.push(tier);
        }
        TierRegistry::new(tiers)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: RegistryConfig = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Failed to parse registry JSON: {}", e)))?;
        TierRegistry::from_config(config)
    }

    /// Load and validate a registry JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read registry {}: {}", path.display(), e))
        })?;
        let registry = TierRegistry::from_json_str(&json)?;
        log::info!(
            "Loaded tier registry from {} ({} tiers)",
            path.display(),
            registry.tiers.len()
        );
        Ok(registry)
    }

    pub fn to_config(&self) -> RegistryConfig {
        RegistryConfig {
            tiers: self
                .tiers
                .iter()
                .map(|t| TierConfig {
                    rank: i64::from(t.rank),
                    name: t.name.clone(),
                    recipients: t.recipients.clone(),
                    required_total: Some(t.required_total),
                })
                .collect(),
        }
    }

    /// Tiers in rank order.
    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn tier(&self, rank: u32) -> Option<&Tier> {
        self.tiers.iter().find(|t| t.rank == rank)
    }

    /// Locate a recipient and the tier it belongs to.
    pub fn recipient(&self, id: &str) -> Option<(&Tier, &Recipient)> {
        self.tiers
            .iter()
            .find_map(|t| t.recipient(id).map(|r| (t, r)))
    }

    /// Sum of every tier requirement.
    pub fn total_required(&self) -> Result<Money> {
        Money::checked_sum(self.tiers.iter().map(|t| t.required_total))
            .ok_or_else(|| Error::Config("Registry required totals overflow".to_string()))
    }

    pub fn allocate(&self, pool: &Pool) -> Result<Vec<AllocationResult>> {
        allocate(pool, &self.tiers)
    }
}

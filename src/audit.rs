//! Audit fingerprints for engine outputs.
//!
//! A digest is the lowercase hex SHA-256 of the canonical bincode encoding of
//! an output. Identical inputs always yield identical digests, so a stored
//! digest lets an auditor confirm a re-run reproduced the same result.

use crate::collections::AggregatedCollection;
use crate::engine::WaterfallReport;
use crate::sha256_digest;
use serde::Serialize;

/// SHA256 hash of data, lowercase hex.
pub fn audit_hash(data: &[u8]) -> String {
    hex::encode(sha256_digest(data))
}

fn canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    bincode::serialize(value).unwrap_or_default()
}

/// Digest of a waterfall report, ignoring its own `digest` field.
pub fn report_digest(report: &WaterfallReport) -> String {
    let mut unsigned = report.clone();
    unsigned.digest.clear();
    audit_hash(&canonical_bytes(&unsigned))
}

/// Digest of an aggregation output.
pub fn collections_digest(aggregates: &[AggregatedCollection]) -> String {
    audit_hash(&canonical_bytes(&aggregates))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_hash_deterministic() {
        let h1 = audit_hash(b"waterfall");
        let h2 = audit_hash(b"waterfall");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
        assert_ne!(h1, audit_hash(b"waterfall2"));
    }

    #[test]
    fn test_empty_collections_digest_is_stable() {
        assert_eq!(collections_digest(&[]), collections_digest(&[]));
    }
}

pub mod audit;
pub mod collections;
pub mod config;
pub mod engine;
pub mod error;
pub mod logger;
pub mod money;
pub mod registry;

use sha2::{Digest, Sha256};

pub use engine::{allocate, apply_split, run_waterfall, Pool, StatutoryRate};
pub use money::Money;
pub use registry::TierRegistry;

/// Calculate SHA256 digest
pub fn sha256_digest(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

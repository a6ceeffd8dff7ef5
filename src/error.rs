use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Rounding reconciliation failed: {0}")]
    RoundingReconciliation(String),

    #[error("Collection entry {entity_id}/{period}/{charge_code} is audit-locked")]
    AuditLocked {
        entity_id: String,
        period: String,
        charge_code: String,
    },

    #[error("Approval error: {0}")]
    Approval(String),
}

pub type Result<T> = std::result::Result<T, Error>;

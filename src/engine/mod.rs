pub mod allocation;
pub mod disbursement;
pub mod split;

pub use allocation::{allocate, AllocationResult, Pool, RecipientAllocation};
pub use disbursement::{pool_health_index, run_waterfall, DisbursementLine, WaterfallReport};
pub use split::{apply_split, StatutoryRate, StatutorySplit, SERC_STATUTORY_RATE_BPS};

pub mod aggregate;
pub mod entry;
pub mod ledger;

pub use aggregate::{aggregate, AggregatedCollection};
pub use entry::{parse_entries, CollectionEntry, CollectionStatus, Period, RawCollectionEntry};
pub use ledger::{CollectionLedger, EntryId};

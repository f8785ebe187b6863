//! The archive: one immutable snapshot of each owner's totals per finished
//! period.

mod archive_endpoint;
mod core;
mod period;

pub use archive_endpoint::list_archive_endpoint;
pub use core::{ArchiveEntry, create_archive_table};
pub use period::PeriodLabel;

pub(crate) use core::{insert_archive_entry_if_absent, list_archive_entries};

//! The persistent result ledger and the side tables written next to it.

mod ledger_lock;
mod result_row;
mod snapshot;
mod store;

pub use ledger_lock::{LedgerLockGuard, acquire_ledger_lock, lock_path_for};
pub use result_row::ResultRow;
pub use snapshot::{write_catalog_snapshot, write_failures};
pub use store::{Ledger, archive_ledger};

/// Log target for the ledger
const LOG_TARGET: &str = "    ledger";

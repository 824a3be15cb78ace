//! Database access layer for wrrl-ld
//!
//! The ledger daemon keeps exactly one table of its own, the command
//! journal. Everything else (settings, schema version) lives in wrrl-common.

mod journal;

pub use journal::{append_command, browse, load_all, record_outcome, JournalEntry};

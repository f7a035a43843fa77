//! trieur - sort the files of a directory into folders, and put them back
//!
//! This library classifies the top-level files of a directory by type,
//! modification month or size, moves them into matching folders with
//! fail-fast rollback, records every move in a ledger next to the files, and
//! restores the original layout from that ledger.

pub mod cli;
pub mod config;
pub mod destination;
pub mod diagnostics;
pub mod error;
pub mod file_category;
pub mod file_organizer;
pub mod ledger;
pub mod output;
pub mod progress;
pub mod rollback;
pub mod sorter;
pub mod undo;

pub use config::{ConfigError, Settings, SortConfig, SortMode};
pub use diagnostics::{DiagnosticsSink, MemorySink, NullSink, TracingSink};
pub use error::{TrieurError, TrieurResult};
pub use file_category::{CategoryTable, SizeBuckets};
pub use file_organizer::{Mover, SafeMover};
pub use ledger::MoveLedger;
pub use progress::ProgressFn;
pub use sorter::{RunStatus, SortEngine, SortReport, sort};
pub use undo::{RestoreEngine, RestoreReport, restore};

pub use cli::{Cli, run_cli};

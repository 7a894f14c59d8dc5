//! Schema migration subsystem.
//!
//! # Data Flow
//! ```text
//! migrations dir (V{n}__{name}.sql)
//!     → migration.rs (parse, sort, reject duplicates)
//!     → runner.rs (advisory lock → skip applied → apply in order)
//!     → store.rs (apply SQL + record version as a unit)
//! ```
//!
//! # Design Decisions
//! - Invoked by operator or pipeline, never automatically on deploy
//! - One writer at a time: bounded lock wait, then `LockHeld`
//! - Failure halts at the failing version; the marker always names the
//!   last fully-applied version

pub mod migration;
pub mod runner;
pub mod store;

pub use migration::{load_dir, Migration};
pub use runner::MigrationRunner;
pub use store::{JournalStore, MigrationError, MigrationStore};

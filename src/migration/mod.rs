//! Migration orchestration.
//!
//! Composes discovery, the service controller, the directory migrator and
//! the unit file patcher into a per-unit state machine
//! (`discovered -> stopped -> moved -> patched -> started -> completed`)
//! and a batch driver with abort-on-first-failure semantics.
//!
//! # Overview
//!
//! - Units are processed strictly in discovery order, one at a time
//! - Template instances are logged and skipped without aborting the batch
//! - The first failure halts the batch; later units show no transitions
//! - There is no rollback: a stopped unit whose move or patch fails is
//!   deliberately left stopped, with the unit file backup as the only
//!   recovery artifact

mod executor;
mod types;

pub use executor::MigrationExecutor;
pub use types::{BatchResult, MigrationError, MigrationOutcome, Stage, UnitReport};

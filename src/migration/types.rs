//! Types for the migration pipeline.

use crate::fsops::MoveError;
use crate::patcher::PatchError;
use crate::systemd::SystemdError;
use std::fmt;
use thiserror::Error;

/// Per-unit pipeline states, in order. `Failed` and `SkippedTemplate` are
/// absorbing; every error is terminal for its unit and, through the batch
/// policy, for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Discovered,
    Stopped,
    Moved,
    Patched,
    Started,
    Completed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Discovered => "discovered",
            Stage::Stopped => "stopped",
            Stage::Moved => "moved",
            Stage::Patched => "patched",
            Stage::Started => "started",
            Stage::Completed => "completed",
        };
        write!(f, "{name}")
    }
}

/// Error types for a single unit's migration, one per failing stage.
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("unit {0} is not known to the service manager")]
    NotFound(String),

    #[error("failed to stop unit: {0}")]
    Stop(#[source] SystemdError),

    #[error(transparent)]
    Move(#[from] MoveError),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error("failed to start unit: {0}")]
    Start(#[source] SystemdError),
}

impl MigrationError {
    /// The stage the unit failed to reach.
    pub fn failed_stage(&self) -> Stage {
        match self {
            MigrationError::NotFound(_) => Stage::Discovered,
            MigrationError::Stop(_) => Stage::Stopped,
            MigrationError::Move(_) => Stage::Moved,
            MigrationError::Patch(_) => Stage::Patched,
            MigrationError::Start(_) => Stage::Started,
        }
    }

    /// Short label for the run log, e.g. "move".
    pub fn stage_label(&self) -> &'static str {
        match self {
            MigrationError::NotFound(_) => "lookup",
            MigrationError::Stop(_) => "stop",
            MigrationError::Move(_) => "move",
            MigrationError::Patch(_) => "patch",
            MigrationError::Start(_) => "start",
        }
    }
}

/// Per-unit result.
#[derive(Debug)]
pub enum MigrationOutcome {
    /// All five stages ran; the unit is serving from the new path.
    Success,
    /// Template instance; enumerated, logged, never touched.
    SkippedTemplate,
    /// Terminal failure at some stage. Aborts the batch.
    Failed(MigrationError),
}

impl MigrationOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, MigrationOutcome::Failed(_))
    }
}

/// One processed unit and what happened to it.
#[derive(Debug)]
pub struct UnitReport {
    pub unit_name: String,
    pub outcome: MigrationOutcome,
}

/// Aggregate outcome over all discovered units.
#[derive(Debug, Default)]
pub struct BatchResult {
    /// Reports in processing order. Units after an aborting failure are
    /// absent: they were never touched.
    pub reports: Vec<UnitReport>,
    /// Whether a failure cut the batch short.
    pub aborted: bool,
}

impl BatchResult {
    /// Batch success requires every non-skipped unit to have migrated.
    /// An empty discovery result counts as success.
    pub fn succeeded(&self) -> bool {
        !self.aborted && self.reports.iter().all(|r| !r.outcome.is_failure())
    }

    pub fn migrated(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, MigrationOutcome::Success))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, MigrationOutcome::SkippedTemplate))
            .count()
    }
}

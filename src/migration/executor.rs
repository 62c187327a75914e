//! Batch driver for the per-unit migration pipeline.

use super::types::{BatchResult, MigrationError, MigrationOutcome, Stage, UnitReport};
use crate::config::MigrationConfig;
use crate::discovery::{discover_units, ManagedUnit};
use crate::fsops::migrate_tree;
use crate::logsink::RunLog;
use crate::patcher::patch_unit_file;
use crate::systemd::{LoadState, ServiceManager, SystemdError};

/// Runs the migration: discovery once, then one unit at a time through
/// stop, move, patch, start. The first unit to fail halts the batch; the
/// remaining units are never queried or touched. There is no compensating
/// rollback anywhere: a unit stopped before a failing move stays stopped.
pub struct MigrationExecutor<'a> {
    manager: &'a dyn ServiceManager,
    config: &'a MigrationConfig,
    log: RunLog,
}

impl<'a> MigrationExecutor<'a> {
    pub fn new(manager: &'a dyn ServiceManager, config: &'a MigrationConfig, log: RunLog) -> Self {
        Self {
            manager,
            config,
            log,
        }
    }

    /// Process the whole fleet. Only discovery-level failures propagate as
    /// `Err`; per-unit failures are reported through the `BatchResult`.
    pub async fn run(&mut self) -> Result<BatchResult, SystemdError> {
        self.log.info(format!(
            "Starting migration of units matching \"{}*\": {} -> {}",
            self.config.unit_prefix,
            self.config.old_base.display(),
            self.config.new_base.display()
        ));

        let units = match discover_units(self.manager, self.config).await {
            Ok(units) => units,
            Err(e) => {
                self.log.error(format!("Unit discovery failed: {e}"));
                return Err(e);
            }
        };

        if units.is_empty() {
            self.log.info(format!(
                "No units matching \"{}*\" found, nothing to do",
                self.config.unit_prefix
            ));
            return Ok(BatchResult::default());
        }

        self.log.info(format!("Discovered {} unit(s)", units.len()));

        let mut result = BatchResult::default();

        for unit in &units {
            let outcome = self.migrate_unit(unit).await;

            if let MigrationOutcome::Failed(error) = &outcome {
                self.log.error(format!(
                    "Unit {} failed at {} stage: {}",
                    unit.unit_name,
                    error.stage_label(),
                    error
                ));
            }

            let failed = outcome.is_failure();
            result.reports.push(UnitReport {
                unit_name: unit.unit_name.clone(),
                outcome,
            });

            if failed {
                result.aborted = true;
                self.log.error(format!(
                    "Aborting batch after {}; {} unit(s) not attempted",
                    unit.unit_name,
                    units.len() - result.reports.len()
                ));
                break;
            }
        }

        if result.succeeded() {
            self.log.info(format!(
                "Batch complete: {} migrated, {} skipped",
                result.migrated(),
                result.skipped()
            ));
        } else {
            self.log.error(format!(
                "Batch failed: {} migrated, {} skipped before abort",
                result.migrated(),
                result.skipped()
            ));
        }

        Ok(result)
    }

    /// Drive one unit through the state machine:
    /// discovered, stopped, moved, patched, started, completed.
    pub async fn migrate_unit(&mut self, unit: &ManagedUnit) -> MigrationOutcome {
        let name = unit.unit_name.as_str();

        if unit.is_template_instance() {
            self.log
                .info(format!("Skipping template instance {name}"));
            return MigrationOutcome::SkippedTemplate;
        }

        self.log.info(format!(
            "Migrating {name}: {} -> {}",
            unit.old_data_path.display(),
            unit.new_data_path.display()
        ));

        // discovered -> stopped
        match self.manager.load_state(name).await {
            Ok(LoadState::NotFound) => {
                return MigrationOutcome::Failed(MigrationError::NotFound(name.to_string()))
            }
            Ok(_) => {}
            Err(e) => return MigrationOutcome::Failed(MigrationError::Stop(e)),
        }

        match self.manager.is_active(name).await {
            Ok(true) => {
                if let Err(e) = self.manager.stop(name).await {
                    return MigrationOutcome::Failed(MigrationError::Stop(e));
                }
                self.log.info(format!("Stopped {name}"));
            }
            Ok(false) => {
                self.log
                    .info(format!("{name} is already stopped, not stopping"));
            }
            Err(e) => return MigrationOutcome::Failed(MigrationError::Stop(e)),
        }

        // stopped -> moved
        if let Err(e) = migrate_tree(&unit.old_data_path, &unit.new_data_path) {
            return MigrationOutcome::Failed(e.into());
        }
        self.log.info(format!(
            "Copied and verified data of {name} at {}",
            unit.new_data_path.display()
        ));

        // moved -> patched
        let report = match patch_unit_file(self.manager, self.config, unit).await {
            Ok(report) => report,
            Err(e) => return MigrationOutcome::Failed(e.into()),
        };
        self.log.info(format!(
            "Patched unit file of {name}: {} line(s) rewritten, backup at {}",
            report.rewritten_lines,
            report.backup_path.display()
        ));

        // patched -> started
        if let Err(e) = self.manager.start(name).await {
            return MigrationOutcome::Failed(MigrationError::Start(e));
        }
        self.log.info(format!("Started {name}"));

        // started -> completed
        self.log
            .info(format!("Migration of {name} {}", Stage::Completed));
        MigrationOutcome::Success
    }
}

mod common;

use common::{create_test_dir, seed_data_dir, test_config, write_unit_file, MockManager};
use std::fs;
use unitmove::fsops::MoveError;
use unitmove::logsink::RunLog;
use unitmove::migration::{MigrationError, MigrationExecutor, MigrationOutcome};
use unitmove::patcher::PatchError;

fn run_log(config: &unitmove::config::MigrationConfig) -> RunLog {
    RunLog::open(&config.log_path).expect("Should open run log")
}

#[tokio::test]
async fn test_full_batch_migrates_and_skips_templates() {
    let temp = create_test_dir();
    let config = test_config(temp.path());
    let manager = MockManager::new(&[
        "foobar-alpha.service",
        "foobar-beta@1.service",
        "foobar-gamma.service",
    ]);

    for service in ["alpha", "gamma"] {
        seed_data_dir(&config, service);
        write_unit_file(&config, &format!("foobar-{service}.service"), service);
        manager.set_active(&format!("foobar-{service}.service"));
    }

    let mut executor = MigrationExecutor::new(&manager, &config, run_log(&config));
    let result = executor.run().await.expect("Discovery should succeed");

    assert!(result.succeeded());
    assert_eq!(result.migrated(), 2);
    assert_eq!(result.skipped(), 1);
    assert_eq!(result.reports[0].unit_name, "foobar-alpha.service");
    assert_eq!(result.reports[2].unit_name, "foobar-gamma.service");

    // Template instance reached no stage at all
    assert!(manager.calls_for("foobar-beta@1.service").is_empty());
    assert!(matches!(
        result.reports[1].outcome,
        MigrationOutcome::SkippedTemplate
    ));

    // Data landed at the new base, sources were kept, services restarted
    for service in ["alpha", "gamma"] {
        assert!(config.new_base.join(service).join("app.db").is_file());
        assert!(config.old_base.join(service).join("app.db").is_file());
        assert!(manager.is_marked_active(&format!("foobar-{service}.service")));

        let unit_file = fs::read_to_string(
            config.unit_file_dir.join(format!("foobar-{service}.service")),
        )
        .unwrap();
        assert!(unit_file
            .contains(&format!("WorkingDirectory={}", config.new_base.join(service).display())));
    }
}

#[tokio::test]
async fn test_first_failure_aborts_and_leaves_later_units_untouched() {
    let temp = create_test_dir();
    let config = test_config(temp.path());
    let manager = MockManager::new(&["foobar-alpha.service", "foobar-gamma.service"]);

    // alpha has no data directory, so its move stage fails; gamma is fully
    // prepared but must never be touched.
    write_unit_file(&config, "foobar-alpha.service", "alpha");
    manager.set_active("foobar-alpha.service");
    seed_data_dir(&config, "gamma");
    let gamma_unit_file = write_unit_file(&config, "foobar-gamma.service", "gamma");
    manager.set_active("foobar-gamma.service");

    let mut executor = MigrationExecutor::new(&manager, &config, run_log(&config));
    let result = executor.run().await.expect("Discovery should succeed");

    assert!(!result.succeeded());
    assert!(result.aborted);
    assert_eq!(result.reports.len(), 1);
    assert!(matches!(
        result.reports[0].outcome,
        MigrationOutcome::Failed(MigrationError::Move(MoveError::SourceMissing(_)))
    ));

    // No stage transitions for gamma: never queried, stopped or patched
    assert!(manager.calls_for("foobar-gamma.service").is_empty());
    assert!(!config.new_base.join("gamma").exists());
    assert_eq!(
        fs::read_to_string(config.unit_file_dir.join("foobar-gamma.service")).unwrap(),
        gamma_unit_file
    );

    // No rollback: alpha was stopped before the move failed and stays down
    assert!(!manager.is_marked_active("foobar-alpha.service"));
}

#[tokio::test]
async fn test_empty_discovery_is_a_successful_noop() {
    let temp = create_test_dir();
    let config = test_config(temp.path());
    let manager = MockManager::new(&[]);

    let mut executor = MigrationExecutor::new(&manager, &config, run_log(&config));
    let result = executor.run().await.expect("Discovery should succeed");

    assert!(result.succeeded());
    assert!(result.reports.is_empty());
    assert_eq!(manager.calls(), vec!["list-units foobar-*"]);

    let log = fs::read_to_string(&config.log_path).unwrap();
    assert!(log.contains("No units matching \"foobar-*\" found"));
}

#[tokio::test]
async fn test_unknown_unit_fails_before_any_mutation() {
    let temp = create_test_dir();
    let config = test_config(temp.path());
    let mut manager = MockManager::new(&["foobar-alpha.service"]);
    manager.missing.insert("foobar-alpha.service".to_string());

    let mut executor = MigrationExecutor::new(&manager, &config, run_log(&config));
    let result = executor.run().await.expect("Discovery should succeed");

    assert!(result.aborted);
    assert!(matches!(
        result.reports[0].outcome,
        MigrationOutcome::Failed(MigrationError::NotFound(_))
    ));

    let calls = manager.calls();
    assert!(!calls.iter().any(|c| c.starts_with("stop ")));
    assert!(!calls.iter().any(|c| c.starts_with("start ")));
}

#[tokio::test]
async fn test_rerun_after_migration_fails_at_move() {
    let temp = create_test_dir();
    let config = test_config(temp.path());
    let manager = MockManager::new(&["foobar-alpha.service"]);

    seed_data_dir(&config, "alpha");
    write_unit_file(&config, "foobar-alpha.service", "alpha");
    manager.set_active("foobar-alpha.service");

    let mut executor = MigrationExecutor::new(&manager, &config, run_log(&config));
    assert!(executor.run().await.unwrap().succeeded());

    // Simulate the migrated steady state: old data gone, unit file already
    // pointing at the new base. The source check is unconditional, so a
    // re-run must surface as a move failure rather than silently succeed.
    fs::remove_dir_all(config.old_base.join("alpha")).unwrap();

    let mut executor = MigrationExecutor::new(&manager, &config, run_log(&config));
    let result = executor.run().await.expect("Discovery should succeed");

    assert!(!result.succeeded());
    assert!(matches!(
        result.reports[0].outcome,
        MigrationOutcome::Failed(MigrationError::Move(MoveError::SourceMissing(_)))
    ));
}

#[tokio::test]
async fn test_backup_survives_a_late_stage_failure() {
    let temp = create_test_dir();
    let config = test_config(temp.path());
    let mut manager = MockManager::new(&["foobar-alpha.service"]);
    manager.fail_start.insert("foobar-alpha.service".to_string());

    seed_data_dir(&config, "alpha");
    let original = write_unit_file(&config, "foobar-alpha.service", "alpha");
    manager.set_active("foobar-alpha.service");

    let mut executor = MigrationExecutor::new(&manager, &config, run_log(&config));
    let result = executor.run().await.expect("Discovery should succeed");

    assert!(result.aborted);
    assert!(matches!(
        result.reports[0].outcome,
        MigrationOutcome::Failed(MigrationError::Start(_))
    ));

    // The pre-patch bytes are still recoverable even though start failed
    let backup = config.unit_file_dir.join("foobar-alpha.service.bak");
    assert_eq!(fs::read_to_string(&backup).unwrap(), original);
}

#[tokio::test]
async fn test_already_stopped_unit_is_not_stopped_again() {
    let temp = create_test_dir();
    let config = test_config(temp.path());
    let manager = MockManager::new(&["foobar-alpha.service"]);

    seed_data_dir(&config, "alpha");
    write_unit_file(&config, "foobar-alpha.service", "alpha");
    // Not marked active: the unit is already down

    let mut executor = MigrationExecutor::new(&manager, &config, run_log(&config));
    let result = executor.run().await.expect("Discovery should succeed");

    assert!(result.succeeded());
    let calls = manager.calls();
    assert!(!calls.iter().any(|c| c.starts_with("stop ")));
    assert!(calls.iter().any(|c| c == "start foobar-alpha.service"));
}

#[tokio::test]
async fn test_missing_unit_file_aborts_at_patch() {
    let temp = create_test_dir();
    let config = test_config(temp.path());
    let manager = MockManager::new(&["foobar-alpha.service"]);

    seed_data_dir(&config, "alpha");
    // No unit file on disk for alpha
    manager.set_active("foobar-alpha.service");

    let mut executor = MigrationExecutor::new(&manager, &config, run_log(&config));
    let result = executor.run().await.expect("Discovery should succeed");

    assert!(result.aborted);
    assert!(matches!(
        result.reports[0].outcome,
        MigrationOutcome::Failed(MigrationError::Patch(PatchError::ConfigMissing(_)))
    ));

    // The data was already copied before the patch stage failed; the unit
    // stays stopped and nothing rolls the copy back.
    assert!(config.new_base.join("alpha").join("app.db").is_file());
    assert!(!manager.is_marked_active("foobar-alpha.service"));
}

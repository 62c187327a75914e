#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;
use unitmove::config::MigrationConfig;
use unitmove::systemd::{LoadState, ServiceManager, SystemdError};

/// Create a temporary sandbox directory for a test
pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// Build a config rooted inside the sandbox, using the "foobar-" fleet prefix
pub fn test_config(root: &Path) -> MigrationConfig {
    MigrationConfig {
        unit_prefix: "foobar-".to_string(),
        old_base: root.join("old"),
        new_base: root.join("new"),
        unit_file_dir: root.join("units"),
        log_path: root.join("run.log"),
        backup_suffix: ".bak".to_string(),
    }
}

/// Write a realistic unit file for `unit_name` pointing at the old data path
pub fn write_unit_file(config: &MigrationConfig, unit_name: &str, service_name: &str) -> String {
    let old_path = config.old_base.join(service_name);
    let content = format!(
        "[Unit]\n\
         Description={service_name} backend\n\
         \n\
         [Service]\n\
         WorkingDirectory={old}\n\
         ExecStart={old}/bin/run --port 8080\n\
         ExecStartPre=/usr/bin/env true\n\
         \n\
         [Install]\n\
         WantedBy=multi-user.target\n",
        old = old_path.display()
    );

    std::fs::create_dir_all(&config.unit_file_dir).unwrap();
    std::fs::write(config.unit_file_dir.join(unit_name), &content).unwrap();
    content
}

/// Seed a small data tree under the old base for `service_name`
pub fn seed_data_dir(config: &MigrationConfig, service_name: &str) {
    let dir = config.old_base.join(service_name);
    std::fs::create_dir_all(dir.join("state")).unwrap();
    std::fs::write(dir.join("app.db"), b"data bytes").unwrap();
    std::fs::write(dir.join("state").join("cursor"), b"42").unwrap();
}

/// In-memory `ServiceManager` recording every call it receives.
#[derive(Default)]
pub struct MockManager {
    pub units: Vec<String>,
    pub active: Mutex<HashSet<String>>,
    /// Units reported as unknown by `load_state`
    pub missing: HashSet<String>,
    pub fail_stop: HashSet<String>,
    pub fail_start: HashSet<String>,
    pub calls: Mutex<Vec<String>>,
}

impl MockManager {
    pub fn new(units: &[&str]) -> Self {
        Self {
            units: units.iter().map(|u| u.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn set_active(&self, unit: &str) {
        self.active.lock().unwrap().insert(unit.to_string());
    }

    pub fn is_marked_active(&self, unit: &str) -> bool {
        self.active.lock().unwrap().contains(unit)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// All recorded calls naming `unit`
    pub fn calls_for(&self, unit: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.contains(unit))
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn failure(&self, command: &str) -> SystemdError {
        SystemdError::CommandFailed {
            command: command.to_string(),
            code: "1".to_string(),
            stderr: "mock failure".to_string(),
        }
    }
}

#[async_trait]
impl ServiceManager for MockManager {
    async fn list_units(&self, pattern: &str) -> Result<Vec<String>, SystemdError> {
        self.record(format!("list-units {pattern}"));
        Ok(self.units.clone())
    }

    async fn load_state(&self, unit: &str) -> Result<LoadState, SystemdError> {
        self.record(format!("load-state {unit}"));
        if self.missing.contains(unit) {
            Ok(LoadState::NotFound)
        } else {
            Ok(LoadState::Loaded)
        }
    }

    async fn is_active(&self, unit: &str) -> Result<bool, SystemdError> {
        self.record(format!("is-active {unit}"));
        Ok(self.active.lock().unwrap().contains(unit))
    }

    async fn stop(&self, unit: &str) -> Result<(), SystemdError> {
        self.record(format!("stop {unit}"));
        if self.fail_stop.contains(unit) {
            return Err(self.failure(&format!("systemctl stop {unit}")));
        }
        self.active.lock().unwrap().remove(unit);
        Ok(())
    }

    async fn start(&self, unit: &str) -> Result<(), SystemdError> {
        self.record(format!("start {unit}"));
        if self.fail_start.contains(unit) {
            return Err(self.failure(&format!("systemctl start {unit}")));
        }
        self.active.lock().unwrap().insert(unit.to_string());
        Ok(())
    }

    async fn daemon_reload(&self) -> Result<(), SystemdError> {
        self.record("daemon-reload".to_string());
        Ok(())
    }
}

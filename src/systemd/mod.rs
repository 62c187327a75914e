//! Service-manager boundary.
//!
//! Everything the pipeline needs from systemd goes through the
//! [`ServiceManager`] trait so the orchestrator can be exercised against a
//! mock. The production implementation shells out to `systemctl`; each call
//! is a single blocking round trip with no retry.

use async_trait::async_trait;
use std::process::Output;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SystemdError {
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("{command} exited with {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: String,
        stderr: String,
    },
}

/// Load state of a unit as reported by the service manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loaded,
    NotFound,
    Other(String),
}

/// Operations consumed from the service manager.
///
/// Mutating calls return success or a failure signal; there are no
/// partial or streaming results.
#[async_trait]
pub trait ServiceManager: Send + Sync {
    /// Enumerate unit identifiers matching `pattern`, including inactive
    /// ones, in the service manager's order.
    async fn list_units(&self, pattern: &str) -> Result<Vec<String>, SystemdError>;

    /// Query whether the unit is known to the service manager at all.
    async fn load_state(&self, unit: &str) -> Result<LoadState, SystemdError>;

    /// Query live running state; does not mutate.
    async fn is_active(&self, unit: &str) -> Result<bool, SystemdError>;

    /// Stop the unit. A single attempt, no retry.
    async fn stop(&self, unit: &str) -> Result<(), SystemdError>;

    /// Start the unit. A single attempt, no retry.
    async fn start(&self, unit: &str) -> Result<(), SystemdError>;

    /// Reload unit definitions from disk (daemon-reload).
    async fn daemon_reload(&self) -> Result<(), SystemdError>;
}

/// Production `ServiceManager` backed by the `systemctl` binary.
pub struct SystemdManager;

impl SystemdManager {
    pub fn new() -> Self {
        Self
    }

    async fn run(&self, args: &[&str]) -> Result<Output, SystemdError> {
        let command = format!("systemctl {}", args.join(" "));
        debug!(command = %command, "Executing");

        tokio::process::Command::new("systemctl")
            .args(args)
            .output()
            .await
            .map_err(|source| SystemdError::Spawn {
                command: command.clone(),
                source,
            })
    }

    /// Run a mutating command, mapping non-zero completion to an error.
    async fn run_checked(&self, args: &[&str]) -> Result<(), SystemdError> {
        let output = self.run(args).await?;
        if output.status.success() {
            return Ok(());
        }

        Err(SystemdError::CommandFailed {
            command: format!("systemctl {}", args.join(" ")),
            code: output
                .status
                .code()
                .map_or_else(|| "signal".to_string(), |c| c.to_string()),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

impl Default for SystemdManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServiceManager for SystemdManager {
    async fn list_units(&self, pattern: &str) -> Result<Vec<String>, SystemdError> {
        let output = self
            .run(&[
                "list-units",
                "--all",
                "--plain",
                "--no-legend",
                "--no-pager",
                pattern,
            ])
            .await?;

        if !output.status.success() {
            return Err(SystemdError::CommandFailed {
                command: format!("systemctl list-units {pattern}"),
                code: output
                    .status
                    .code()
                    .map_or_else(|| "signal".to_string(), |c| c.to_string()),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(parse_unit_list(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn load_state(&self, unit: &str) -> Result<LoadState, SystemdError> {
        let output = self
            .run(&["show", "--property", "LoadState", "--value", unit])
            .await?;

        // `systemctl show` exits 0 even for unknown units and prints
        // "not-found"; a hard failure here is a real systemd error.
        if !output.status.success() {
            return Err(SystemdError::CommandFailed {
                command: format!("systemctl show {unit}"),
                code: output
                    .status
                    .code()
                    .map_or_else(|| "signal".to_string(), |c| c.to_string()),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let state = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(match state.as_str() {
            "loaded" => LoadState::Loaded,
            "not-found" | "" => LoadState::NotFound,
            _ => LoadState::Other(state),
        })
    }

    async fn is_active(&self, unit: &str) -> Result<bool, SystemdError> {
        // `is-active` exits 0 iff the unit is active; a non-zero exit is a
        // negative answer, not an error.
        let output = self.run(&["is-active", "--quiet", unit]).await?;
        Ok(output.status.success())
    }

    async fn stop(&self, unit: &str) -> Result<(), SystemdError> {
        self.run_checked(&["stop", unit]).await
    }

    async fn start(&self, unit: &str) -> Result<(), SystemdError> {
        self.run_checked(&["start", unit]).await
    }

    async fn daemon_reload(&self) -> Result<(), SystemdError> {
        self.run_checked(&["daemon-reload"]).await
    }
}

/// Parse `systemctl list-units --plain --no-legend` output: one unit per
/// line, identifier in the first column.
fn parse_unit_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(|name| name.to_string())
        .collect()
}

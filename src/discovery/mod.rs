//! Unit discovery.
//!
//! Enumerates every unit matching the configured prefix, active or not, and
//! derives the per-unit paths the rest of the pipeline works with. Template
//! instances (`name@instance.service`) are enumerated so the run log shows
//! them, but they are flagged and never migrated.

use crate::config::MigrationConfig;
use crate::systemd::{ServiceManager, SystemdError};
use std::path::PathBuf;

/// A discovered unit, immutable once built. Discarded after processing;
/// nothing persists across runs.
#[derive(Debug, Clone)]
pub struct ManagedUnit {
    /// Full unit identifier, prefix included, e.g. "appsrv-alpha.service".
    pub unit_name: String,
    /// Unit name with the fleet prefix and ".service" suffix stripped.
    pub service_name: String,
    /// Current data directory: old base joined with the service name.
    pub old_data_path: PathBuf,
    /// Target data directory: new base joined with the service name.
    pub new_data_path: PathBuf,
}

impl ManagedUnit {
    pub fn new(unit_name: &str, config: &MigrationConfig) -> Self {
        let without_prefix = unit_name
            .strip_prefix(&config.unit_prefix)
            .unwrap_or(unit_name);
        let service_name = without_prefix
            .strip_suffix(".service")
            .unwrap_or(without_prefix)
            .to_string();

        Self {
            unit_name: unit_name.to_string(),
            service_name: service_name.clone(),
            old_data_path: config.old_base.join(&service_name),
            new_data_path: config.new_base.join(&service_name),
        }
    }

    /// A template instance carries an `@` in the unit stem
    /// (e.g. "appsrv-beta@1.service"); those are excluded from migration.
    pub fn is_template_instance(&self) -> bool {
        let stem = self
            .unit_name
            .rsplit_once('.')
            .map_or(self.unit_name.as_str(), |(stem, _)| stem);
        stem.contains('@')
    }
}

/// Enumerate all units matching `<prefix>*`, in the service manager's order.
pub async fn discover_units(
    manager: &dyn ServiceManager,
    config: &MigrationConfig,
) -> Result<Vec<ManagedUnit>, SystemdError> {
    let pattern = format!("{}*", config.unit_prefix);
    let names = manager.list_units(&pattern).await?;

    Ok(names
        .iter()
        .map(|name| ManagedUnit::new(name, config))
        .collect())
}

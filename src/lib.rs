pub mod config;
pub mod discovery;
pub mod fsops;
pub mod logsink;
pub mod migration;
pub mod patcher;
pub mod systemd;
pub mod utils;

// Re-export commonly used types
pub use config::{load_config, ConfigError, MigrationConfig};
pub use discovery::{discover_units, ManagedUnit};
pub use fsops::{compare_trees, migrate_tree, DiffKind, MoveError, TreeDiff};
pub use logsink::RunLog;
pub use migration::{
    BatchResult, MigrationError, MigrationExecutor, MigrationOutcome, Stage, UnitReport,
};
pub use patcher::{patch_unit_file, rewrite_key_if_prefixed, PatchError, PatchReport};
pub use systemd::{LoadState, ServiceManager, SystemdError, SystemdManager};

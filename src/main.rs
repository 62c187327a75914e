mod config;
mod discovery;
mod fsops;
mod logsink;
mod migration;
mod patcher;
mod systemd;
mod utils;

use anyhow::Context;
use clap::Parser;
use config::load_config;
use logsink::RunLog;
use migration::MigrationExecutor;
use systemd::SystemdManager;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Unitmove - data-path migration for fleets of systemd-managed services
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Optional JSON configuration file; defaults are used when absent
    #[arg(short, long, env = "UNITMOVE_CONFIG")]
    config: Option<std::path::PathBuf>,
}

// The whole run is strictly sequential; a current-thread runtime keeps it
// that way while the systemd and fs calls stay in the teacher's async style.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Parse CLI arguments
    let args = Args::parse();

    let config = load_config(args.config.as_deref())
        .await
        .context("failed to load configuration")?;

    let log = RunLog::open(&config.log_path)
        .with_context(|| format!("failed to open run log {}", config.log_path.display()))?;

    let manager = SystemdManager::new();
    let mut executor = MigrationExecutor::new(&manager, &config, log);

    let result = executor.run().await.context("unit discovery failed")?;

    if !result.succeeded() {
        std::process::exit(1);
    }

    Ok(())
}

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use pveoff::{Config, PveoffError, PveoffResult, PveshBackend, ShutdownOrchestrator};
use pveoff_core::node::{current_node_name, local_hostname};
use pveoff_core::observability::init_tracing;

#[derive(Parser)]
#[command(name = "pveoff")]
#[command(version)]
#[command(about = "Priority-ordered graceful shutdown of Proxmox VE guests", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Node name (defaults to the local hostname up to the first '.')
    #[arg(long, global = true)]
    node: Option<String>,

    /// Force-stop guests that do not shut down within their timeout
    #[arg(long, global = true)]
    must_succeed: Option<bool>,

    /// Timeout in seconds for guests without a `down=` startup value
    #[arg(long, global = true)]
    default_timeout: Option<u64>,

    /// Log output format (pretty, compact, json)
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Power off every guest on the node in priority order
    Run,
    /// Print the ordered shutdown plan without powering anything off
    Plan,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> PveoffResult<()> {
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    init_tracing(&config.logging)?;

    if config.shutdown.must_succeed {
        tracing::info!("Must off success: guests outliving their timeout will be force-stopped");
    }

    let node = match cli.node {
        Some(node) => node,
        None => {
            tracing::info!("Current hostname: {}", local_hostname()?);
            current_node_name()?
        }
    };
    tracing::info!("Current node name: {}", node);

    let backend = Arc::new(PveshBackend::new(&config.pvesh));
    let orchestrator = ShutdownOrchestrator::new(backend, node, config.shutdown);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Plan => {
            let plan = orchestrator.plan().await?;
            print!("{}", plan);
        }
        Commands::Run => {
            orchestrator.run().await?;
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> PveoffResult<Config> {
    let mut config = Config::load(cli.config.as_deref())?;

    if let Some(must_succeed) = cli.must_succeed {
        config.shutdown.must_succeed = must_succeed;
    }
    if let Some(secs) = cli.default_timeout {
        config.shutdown.default_timeout = Duration::from_secs(secs);
    }
    if let Some(format) = &cli.log_format {
        config.logging.format = format.clone();
    }

    config
        .validate()
        .map_err(|e| PveoffError::ConfigError(format!("Invalid command-line override: {}", e)))?;
    Ok(config)
}

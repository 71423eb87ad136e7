//! fabop operator agent
//!
//! Drives the staggered restart queues of a blockchain network's components
//! and inspects their state.

use anyhow::Result;
use clap::{Parser, Subcommand};
use fabop_core::ComponentType;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod controller;

use commands::{queues::handle_queues, run::handle_run};
use config::AgentConfig;

#[derive(Parser)]
#[command(name = "fabop")]
#[command(about = "fabop - staggered restart orchestration for blockchain operators", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path
    #[arg(short, long, global = true, default_value = "fabop.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch restart documents and advance their queues
    Run,

    /// Print restart queue documents as JSON
    Queues {
        /// Namespace holding the documents
        #[arg(short, long)]
        namespace: String,

        /// Only this component type (ca, peer, orderer, console)
        #[arg(long)]
        component: Option<ComponentType>,
    },
}

fn init_logging(verbose: bool, level: &str) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AgentConfig::load(&cli.config)?.merge_with_env();
    config.validate()?;
    init_logging(cli.verbose, &config.log_level);

    match cli.command {
        Commands::Run => handle_run(config).await?,
        Commands::Queues {
            namespace,
            component,
        } => handle_queues(&namespace, component, config.restart).await?,
    }
    Ok(())
}

//! The node process entry point: loads configuration, installs structured
//! logging and metrics, constructs the process-wide [`meridian_node::Node`]
//! context, and idles until shutdown.

use std::path::PathBuf;

use clap::Parser;
use meridian_node::{Node, NodeError};
use meridian_types::config::Config;

#[derive(Parser, Debug)]
#[command(name = "meridian-node", about = "Meridian validator/sharder node")]
struct Args {
    /// Path to a TOML configuration document. Missing keys fall back to
    /// their defaults.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Root directory for the node's block archive.
    #[arg(long, value_name = "DIR", default_value = "./data/blocks")]
    archive_root: PathBuf,
}

fn load_config(path: Option<&PathBuf>) -> Result<Config, NodeError> {
    match path {
        None => Ok(Config::default()),
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|source| NodeError::ConfigRead {
                path: path.display().to_string(),
                source,
            })?;
            Ok(Config::from_toml_str(&text)?)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    meridian_telemetry::prelude::init_tracing()?;
    let sink = meridian_telemetry::prelude::install()?;
    meridian_telemetry::sinks::SINK
        .set(sink)
        .map_err(|_| anyhow::anyhow!("telemetry sink already installed"))?;

    let config = load_config(args.config.as_ref())?;
    let node = Node::new(config, &args.archive_root)?;

    tracing::info!(
        archive_root = %args.archive_root.display(),
        current_round = node.current_round(),
        "meridian-node started"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received, exiting");
    Ok(())
}

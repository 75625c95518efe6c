use clap::{Parser, Subcommand};
use nmwifi_core::ServiceConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod console;
mod runner;

/// Lists nearby Wi-Fi networks and creates WPA-PSK profiles through NetworkManager.
#[derive(Debug, Parser)]
#[command(name = "nmwifi", version, about)]
pub struct Cli {
    /// TOML configuration file; built-in defaults are used when omitted.
    #[arg(long, env = "NMWIFI_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan and print the ranked network list.
    List,
    /// Create a profile for SSID; asks for the password unless given.
    Connect {
        ssid: String,
        #[arg(long, env = "NMWIFI_PSK", hide_env_values = true)]
        password: Option<String>,
    },
    /// List, pick a network, enter its password (default).
    Interactive,
    /// Serve the JSON API.
    Serve {
        /// Overrides `bind_addr` from the configuration.
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ServiceConfig::load(path).await?,
        None => ServiceConfig::default(),
    };

    runner::run(Arc::new(config), cli.command.unwrap_or(Command::Interactive)).await
}

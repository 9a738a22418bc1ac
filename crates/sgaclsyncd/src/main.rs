//! sgaclsyncd - TrustSec Egress Policy Sync Daemon
//!
//! Main entry point. Binds the UDP syslog socket, spawns one task per
//! inbound notification, and shuts down on SIGINT/SIGTERM.

use clap::Parser;
use sgaclsyncd::{Config, SgaclSync};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Syslog datagrams larger than this are truncated by the kernel anyway
const MAX_DATAGRAM_SIZE: usize = 8192;

#[derive(Debug, Parser)]
#[command(name = "sgaclsyncd", about = "TrustSec egress policy sync daemon")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "/etc/sgaclsyncd/config.yml")]
    config: PathBuf,

    /// Override the listen address, e.g. 0.0.0.0:514
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Log filter (tracing env-filter syntax)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Initializes tracing/logging subsystem
fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    info!("--- Starting sgaclsyncd ---");

    let mut config = Config::load_or_default(&cli.config)?;
    if let Some(listen) = cli.listen {
        config.listener.host = listen.ip().to_string();
        config.listener.port = listen.port();
    }
    config.validate()?;

    warn!("TLS certificate verification is DISABLED for ERS API calls (self-signed ISE deployments)");
    if config.ers.allowed_instances.is_empty() {
        warn!("No ERS instance allowlist configured, notifications from any sender are trusted");
    }

    run_daemon(config).await
}

/// Main daemon loop: receive datagrams, spawn one handler task per event
async fn run_daemon(config: Config) -> anyhow::Result<()> {
    let bind_addr = format!("{}:{}", config.listener.host, config.listener.port);
    let socket = UdpSocket::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "Listening for ISE syslog notifications");

    let sync = Arc::new(SgaclSync::new(config));
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

    loop {
        tokio::select! {
            received = socket.recv_from(&mut buf) => {
                let (len, peer) = match received {
                    Ok(r) => r,
                    Err(e) => {
                        error!(error = %e, "UDP receive failed");
                        continue;
                    }
                };

                let payload = String::from_utf8_lossy(&buf[..len]).trim().to_string();
                let sync = Arc::clone(&sync);

                tokio::spawn(async move {
                    match sync.handle_notification(&payload, peer.ip()).await {
                        Ok(None) => {}
                        Ok(Some(outcome)) => {
                            info!(instance = %peer.ip(), ?outcome, "Egress policy sync complete");
                        }
                        Err(e) => {
                            // Event-scoped failure; the listener keeps serving.
                            error!(instance = %peer.ip(), error = %e, "Egress policy sync failed");
                        }
                    }
                });
            }
            _ = signal::ctrl_c() => {
                info!("Received SIGINT/SIGTERM, shutting down");
                break;
            }
        }
    }

    info!("sgaclsyncd exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_listen_override() {
        let cli = Cli::parse_from(["sgaclsyncd", "--listen", "127.0.0.1:5514"]);
        assert_eq!(cli.listen, Some("127.0.0.1:5514".parse().unwrap()));
        assert_eq!(cli.config, PathBuf::from("/etc/sgaclsyncd/config.yml"));
    }
}

//! Configuration file support for sgaclsyncd
//!
//! Loads and validates daemon configuration from a YAML file.
//! Default location: /etc/sgaclsyncd/config.yml
//!
//! The ERS credentials live in this file, so it should be root-readable only.

use crate::error::{Result, SgaclSyncError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Syslog listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// Bind address for the UDP syslog socket
    #[serde(default = "default_listen_host")]
    pub host: String,

    /// UDP port (514 is the standard syslog port)
    #[serde(default = "default_listen_port")]
    pub port: u16,
}

/// ISE ERS API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErsConfig {
    /// HTTP basic auth username
    #[serde(default)]
    pub username: String,

    /// HTTP basic auth password
    #[serde(default)]
    pub password: String,

    /// ERS API port on the ISE instance
    #[serde(default = "default_ers_port")]
    pub port: u16,

    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Interval between bulk-status polls in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Maximum bulk-status poll attempts; absent means poll forever,
    /// matching the historical behavior
    #[serde(default)]
    pub max_poll_attempts: Option<u32>,

    /// ISE instances allowed to trigger a sync. Empty list trusts any
    /// sender, which preserves the historical behavior but leaves the
    /// daemon open to spoofed notifications.
    #[serde(default)]
    pub allowed_instances: Vec<IpAddr>,
}

/// Downstream automation (ansible-runner) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationConfig {
    /// ansible-runner private data directory
    #[serde(default = "default_private_data_dir")]
    pub private_data_dir: PathBuf,

    /// Playbook applied to the ASA
    #[serde(default = "default_playbook")]
    pub playbook: String,

    /// Extravars document shared with the playbook
    #[serde(default = "default_extravars_path")]
    pub extravars_path: PathBuf,
}

/// Complete sgaclsyncd configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Syslog listener configuration
    #[serde(default)]
    pub listener: ListenerConfig,

    /// ERS API configuration
    #[serde(default)]
    pub ers: ErsConfig,

    /// Automation trigger configuration
    #[serde(default)]
    pub automation: AutomationConfig,
}

// Default functions
fn default_listen_host() -> String {
    "0.0.0.0".to_string()
}

fn default_listen_port() -> u16 {
    514
}

fn default_ers_port() -> u16 {
    9060
}

fn default_http_timeout() -> u64 {
    10
}

fn default_poll_interval() -> u64 {
    2
}

fn default_private_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_playbook() -> String {
    "asa_acl.yml".to_string()
}

fn default_extravars_path() -> PathBuf {
    PathBuf::from("env/extravars")
}

// Default implementations
impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: default_listen_host(),
            port: default_listen_port(),
        }
    }
}

impl Default for ErsConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            port: default_ers_port(),
            http_timeout_secs: default_http_timeout(),
            poll_interval_secs: default_poll_interval(),
            max_poll_attempts: None,
            allowed_instances: Vec::new(),
        }
    }
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            private_data_dir: default_private_data_dir(),
            playbook: default_playbook(),
            extravars_path: default_extravars_path(),
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => {
                let config = serde_yaml::from_str(&content).map_err(|e| {
                    SgaclSyncError::Config(format!(
                        "Failed to parse config file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    path = %path.display(),
                    "Config file not found, using defaults"
                );
                Ok(Self::default())
            }
            Err(e) => Err(SgaclSyncError::Io(e)),
        }
    }

    /// Get the bulk poll interval as Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.ers.poll_interval_secs)
    }

    /// Get the per-request HTTP timeout as Duration
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.ers.http_timeout_secs)
    }

    /// Whether a sender address may be treated as an ISE instance
    pub fn instance_allowed(&self, addr: IpAddr) -> bool {
        self.ers.allowed_instances.is_empty() || self.ers.allowed_instances.contains(&addr)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.listener.port == 0 {
            return Err(SgaclSyncError::Config(
                "listener.port must be > 0".to_string(),
            ));
        }

        if self.ers.port == 0 {
            return Err(SgaclSyncError::Config("ers.port must be > 0".to_string()));
        }

        if self.ers.poll_interval_secs == 0 {
            return Err(SgaclSyncError::Config(
                "ers.poll_interval_secs must be > 0".to_string(),
            ));
        }

        if self.ers.username.is_empty() || self.ers.password.is_empty() {
            return Err(SgaclSyncError::Config(
                "ers.username and ers.password are required".to_string(),
            ));
        }

        if self.automation.playbook.is_empty() {
            return Err(SgaclSyncError::Config(
                "automation.playbook must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

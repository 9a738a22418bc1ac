//! TrustSec Egress Policy Sync Daemon
//!
//! Listens for ISE syslog change notifications announcing newly created
//! egress matrix cells, resolves the full policy over the ERS REST API,
//! synthesizes ASA `access-list` statements, and triggers an ansible-runner
//! playbook that applies them to the firewall.
//!
//! Pipeline per notification:
//! classify → bulk resolve → expand → synthesize → trigger.
//! Each notification runs on its own task; the only shared resource is the
//! extravars document, serialized inside the trigger.

pub mod classifier;
pub mod config;
pub mod error;
pub mod ers;
pub mod expander;
pub mod resolver;
pub mod sgacl_sync;
pub mod synthesizer;
pub mod trigger;
pub mod types;

pub use classifier::classify;
pub use config::{AutomationConfig, Config, ErsConfig, ListenerConfig};
pub use error::{Result, SgaclSyncError};
pub use ers::{BulkStatus, EgressCell, ErsApi, ErsClient, ResourceStatus, Sgacl, Sgt};
pub use expander::expand;
pub use resolver::BulkPoller;
pub use sgacl_sync::SgaclSync;
pub use synthesizer::synthesize;
pub use trigger::{AnsibleRunner, AutomationTrigger, ExtravarsStore, PlaybookRunner};
pub use types::{
    BulkOperationId, ExpandedPolicy, ResourceId, RunOutcome, RunStats, SynthesizedAcl,
};

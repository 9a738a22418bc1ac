//! Core types for egress policy synchronization

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an in-flight asynchronous bulk operation on the ERS API.
///
/// Extracted from the syslog change notification; lives from extraction
/// until the bulk poll resolves it to a concrete resource id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BulkOperationId(String);

impl BulkOperationId {
    /// Wraps a raw bulk id. Returns `None` for an empty token, which can
    /// never resolve on the ERS side.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.is_empty() { None } else { Some(Self(raw)) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BulkOperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a concrete ERS resource (cell, SGT, or SGACL).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fully expanded egress policy content, ready for ACL synthesis.
///
/// `rule_lines` is the ordered accumulation of every line of every
/// referenced SGACL, including empty lines produced by trailing newlines.
/// `rule_set_name` is the name of the last SGACL on the cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedPolicy {
    pub cell_name: String,
    pub source_sgt_name: String,
    pub dest_sgt_name: String,
    pub rule_set_name: String,
    pub rule_lines: Vec<String>,
}

/// A generated ASA access list: its name and ordered statements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesizedAcl {
    pub name: String,
    pub entries: Vec<String>,
}

/// Task counts reported by an ansible-runner playbook run, summed over hosts.
/// Unreachable hosts count toward `failures`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub ok: u64,
    pub changed: u64,
    pub failures: u64,
}

impl RunStats {
    pub fn has_failures(&self) -> bool {
        self.failures > 0
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ok={} changed={} failures={}",
            self.ok, self.changed, self.failures
        )
    }
}

/// Outcome of one automation trigger.
///
/// A run with failed tasks completes the event (no automatic retry) but is
/// reported distinctly so operators can alert on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Applied(RunStats),
    Failed(RunStats),
}

impl RunOutcome {
    pub fn stats(&self) -> RunStats {
        match self {
            Self::Applied(s) | Self::Failed(s) => *s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_id_rejects_empty() {
        assert!(BulkOperationId::new("").is_none());
        let id = BulkOperationId::new("4af5-ffe1").unwrap();
        assert_eq!(id.as_str(), "4af5-ffe1");
        assert_eq!(id.to_string(), "4af5-ffe1");
    }

    #[test]
    fn test_run_stats_failures() {
        let stats = RunStats {
            ok: 3,
            changed: 1,
            failures: 0,
        };
        assert!(!stats.has_failures());
        assert_eq!(stats.to_string(), "ok=3 changed=1 failures=0");

        let failed = RunStats {
            failures: 2,
            ..stats
        };
        assert!(failed.has_failures());
    }

    #[test]
    fn test_run_outcome_stats() {
        let stats = RunStats {
            ok: 1,
            changed: 1,
            failures: 1,
        };
        assert_eq!(RunOutcome::Failed(stats).stats(), stats);
        assert_eq!(RunOutcome::Applied(stats).stats(), stats);
    }
}

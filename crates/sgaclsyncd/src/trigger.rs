//! Automation trigger
//!
//! Hands a synthesized ACL to the Ansible side: updates the extravars
//! document the `asa_acl` playbook consumes, then invokes ansible-runner.
//! The document update and the run happen as one mutex-guarded critical
//! section so concurrent events can never run the playbook against each
//! other's variables.

use crate::config::AutomationConfig;
use crate::error::{Result, SgaclSyncError};
use crate::types::{RunOutcome, RunStats, SynthesizedAcl};
use async_trait::async_trait;
use serde_yaml::{Mapping, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// File-backed extravars document.
///
/// The document belongs to the automation tooling; this store only ever
/// touches `acl_name` and `acl_entries` and preserves every other key.
/// Writes go to a temp file in the same directory followed by an atomic
/// rename, so a failed write can never leave a half-updated document.
pub struct ExtravarsStore {
    path: PathBuf,
}

impl ExtravarsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the document. A missing or empty file yields an empty mapping.
    pub fn read(&self) -> Result<Mapping> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %self.path.display(), "Extravars file missing, starting empty");
                return Ok(Mapping::new());
            }
            Err(e) => {
                return Err(SgaclSyncError::Persistence(format!(
                    "cannot read {}: {e}",
                    self.path.display()
                )));
            }
        };

        let value: Value = serde_yaml::from_str(&content).map_err(|e| {
            SgaclSyncError::Persistence(format!("cannot parse {}: {e}", self.path.display()))
        })?;

        match value {
            Value::Null => Ok(Mapping::new()),
            Value::Mapping(map) => Ok(map),
            other => Err(SgaclSyncError::Persistence(format!(
                "{} is not a mapping (found {:?})",
                self.path.display(),
                other
            ))),
        }
    }

    /// Overwrites `acl_name`/`acl_entries` and atomically replaces the file.
    pub fn update(&self, acl: &SynthesizedAcl) -> Result<()> {
        let mut doc = self.read()?;

        doc.insert(
            Value::String("acl_name".to_string()),
            Value::String(acl.name.clone()),
        );
        doc.insert(
            Value::String("acl_entries".to_string()),
            Value::Sequence(acl.entries.iter().cloned().map(Value::String).collect()),
        );

        let serialized = serde_yaml::to_string(&doc).map_err(|e| {
            SgaclSyncError::Persistence(format!("cannot serialize extravars: {e}"))
        })?;

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
            SgaclSyncError::Persistence(format!("cannot create temp file in {}: {e}", dir.display()))
        })?;
        tmp.write_all(serialized.as_bytes()).map_err(|e| {
            SgaclSyncError::Persistence(format!("cannot write extravars: {e}"))
        })?;
        tmp.persist(&self.path).map_err(|e| {
            SgaclSyncError::Persistence(format!(
                "cannot replace {}: {e}",
                self.path.display()
            ))
        })?;

        Ok(())
    }
}

/// Runs the downstream playbook. A trait seam so the pipeline can be
/// exercised without an Ansible installation.
#[async_trait]
pub trait PlaybookRunner: Send + Sync {
    async fn run(&self) -> Result<RunStats>;
}

/// Invokes `ansible-runner run <private_data_dir> -p <playbook> --json`
/// and extracts the final task statistics from its event stream.
pub struct AnsibleRunner {
    private_data_dir: PathBuf,
    playbook: String,
}

impl AnsibleRunner {
    pub fn new(private_data_dir: impl Into<PathBuf>, playbook: impl Into<String>) -> Self {
        Self {
            private_data_dir: private_data_dir.into(),
            playbook: playbook.into(),
        }
    }

    /// Parses one `--json` event line; returns stats for the
    /// `playbook_on_stats` event, `None` for every other line.
    fn parse_stats_line(line: &str) -> Option<RunStats> {
        let event: serde_json::Value = serde_json::from_str(line).ok()?;
        if event.get("event")?.as_str()? != "playbook_on_stats" {
            return None;
        }
        let data = event.get("event_data")?;

        let sum_hosts = |key: &str| -> u64 {
            data.get(key)
                .and_then(|m| m.as_object())
                .map(|m| m.values().filter_map(|v| v.as_u64()).sum())
                .unwrap_or(0)
        };

        Some(RunStats {
            ok: sum_hosts("ok"),
            changed: sum_hosts("changed"),
            // "dark" is ansible's term for unreachable hosts
            failures: sum_hosts("failures") + sum_hosts("dark"),
        })
    }
}

#[async_trait]
impl PlaybookRunner for AnsibleRunner {
    async fn run(&self) -> Result<RunStats> {
        let output = Command::new("ansible-runner")
            .arg("run")
            .arg(&self.private_data_dir)
            .arg("-p")
            .arg(&self.playbook)
            .arg("--json")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| SgaclSyncError::Playbook(format!("cannot spawn ansible-runner: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        // The stats event is at the tail of the stream.
        if let Some(stats) = stdout.lines().rev().find_map(Self::parse_stats_line) {
            return Ok(stats);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(SgaclSyncError::Playbook(format!(
            "no playbook stats in ansible-runner output (exit {:?}): {}",
            output.status.code(),
            stderr.trim()
        )))
    }
}

/// Serialized "update extravars → run playbook" trigger.
pub struct AutomationTrigger {
    store: ExtravarsStore,
    runner: Box<dyn PlaybookRunner>,
    lock: Mutex<()>,
}

impl AutomationTrigger {
    /// Builds the production trigger from config.
    pub fn new(config: &AutomationConfig) -> Self {
        Self::with_runner(
            ExtravarsStore::new(&config.extravars_path),
            Box::new(AnsibleRunner::new(
                &config.private_data_dir,
                config.playbook.clone(),
            )),
        )
    }

    pub fn with_runner(store: ExtravarsStore, runner: Box<dyn PlaybookRunner>) -> Self {
        Self {
            store,
            runner,
            lock: Mutex::new(()),
        }
    }

    /// Applies one synthesized ACL.
    ///
    /// Holds the trigger lock from the document write through the playbook
    /// run; a failed run completes the event (no retry) but is reported as
    /// [`RunOutcome::Failed`].
    pub async fn trigger(&self, acl: &SynthesizedAcl) -> Result<RunOutcome> {
        let _guard = self.lock.lock().await;

        self.store.update(acl)?;
        let stats = self.runner.run().await?;

        if stats.has_failures() {
            error!(acl = %acl.name, %stats, "Playbook run reported failed tasks");
            Ok(RunOutcome::Failed(stats))
        } else {
            info!(acl = %acl.name, %stats, "Playbook run complete");
            Ok(RunOutcome::Applied(stats))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_acl() -> SynthesizedAcl {
        SynthesizedAcl {
            name: "EgressCellA_RuleSet1".to_string(),
            entries: vec![
                "access-list EgressCellA_RuleSet1 extended permit tcp \
                 security-group name Servers any security-group name Users any"
                    .to_string(),
            ],
        }
    }

    #[test]
    fn test_update_preserves_unrelated_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extravars");
        std::fs::write(
            &path,
            "asa_host: fw01.example.net\nasa_context: dmz\nacl_name: stale\n",
        )
        .unwrap();

        let store = ExtravarsStore::new(&path);
        store.update(&sample_acl()).unwrap();

        let doc = store.read().unwrap();
        assert_eq!(
            doc[&Value::String("asa_host".into())],
            Value::String("fw01.example.net".into())
        );
        assert_eq!(
            doc[&Value::String("asa_context".into())],
            Value::String("dmz".into())
        );
        assert_eq!(
            doc[&Value::String("acl_name".into())],
            Value::String("EgressCellA_RuleSet1".into())
        );
    }

    #[test]
    fn test_update_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extravars");
        std::fs::write(&path, "{}\n").unwrap();

        let store = ExtravarsStore::new(&path);
        let acl = sample_acl();
        store.update(&acl).unwrap();

        let doc = store.read().unwrap();
        assert_eq!(
            doc[&Value::String("acl_name".into())],
            Value::String(acl.name.clone())
        );
        assert_eq!(
            doc[&Value::String("acl_entries".into())],
            Value::Sequence(vec![Value::String(acl.entries[0].clone())])
        );
    }

    #[test]
    fn test_read_missing_file_yields_empty_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let store = ExtravarsStore::new(dir.path().join("extravars"));
        assert!(store.read().unwrap().is_empty());
    }

    #[test]
    fn test_read_non_mapping_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extravars");
        std::fs::write(&path, "- just\n- a\n- list\n").unwrap();

        let store = ExtravarsStore::new(&path);
        assert!(matches!(
            store.read(),
            Err(SgaclSyncError::Persistence(_))
        ));
    }

    #[test]
    fn test_parse_stats_line() {
        let line = r#"{"event": "playbook_on_stats", "uuid": "x", "event_data": {"ok": {"asa": 3}, "changed": {"asa": 1}, "failures": {}, "dark": {}, "skipped": {"asa": 2}}}"#;
        let stats = AnsibleRunner::parse_stats_line(line).unwrap();
        assert_eq!(
            stats,
            RunStats {
                ok: 3,
                changed: 1,
                failures: 0
            }
        );
    }

    #[test]
    fn test_parse_stats_counts_unreachable_as_failures() {
        let line = r#"{"event": "playbook_on_stats", "event_data": {"ok": {}, "changed": {}, "failures": {"asa": 1}, "dark": {"asa2": 1}}}"#;
        let stats = AnsibleRunner::parse_stats_line(line).unwrap();
        assert_eq!(stats.failures, 2);
    }

    #[test]
    fn test_parse_ignores_other_events() {
        assert!(AnsibleRunner::parse_stats_line(r#"{"event": "runner_on_ok"}"#).is_none());
        assert!(AnsibleRunner::parse_stats_line("not json").is_none());
    }

    struct FixedRunner(RunStats);

    #[async_trait]
    impl PlaybookRunner for FixedRunner {
        async fn run(&self) -> Result<RunStats> {
            Ok(self.0)
        }
    }

    #[tokio::test]
    async fn test_trigger_reports_failed_runs_distinctly() {
        let dir = tempfile::tempdir().unwrap();
        let store = ExtravarsStore::new(dir.path().join("extravars"));
        let failed_stats = RunStats {
            ok: 1,
            changed: 0,
            failures: 2,
        };
        let trigger = AutomationTrigger::with_runner(store, Box::new(FixedRunner(failed_stats)));

        let outcome = trigger.trigger(&sample_acl()).await.unwrap();
        assert_eq!(outcome, RunOutcome::Failed(failed_stats));
    }

    #[tokio::test]
    async fn test_trigger_applied_on_clean_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = ExtravarsStore::new(dir.path().join("extravars"));
        let stats = RunStats {
            ok: 4,
            changed: 2,
            failures: 0,
        };
        let trigger = AutomationTrigger::with_runner(store, Box::new(FixedRunner(stats)));

        let outcome = trigger.trigger(&sample_acl()).await.unwrap();
        assert_eq!(outcome, RunOutcome::Applied(stats));
    }
}

//! §4.11: in-memory snapshot/rollback management plus two-file-per-plan JSON persistence.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::plan::implementation_plan::AppliedRevision;
use crate::plan::{ImplementationPlan, PlanSnapshot};

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("no snapshot recorded for version {0}")]
    UnknownVersion(u64),
}

/// Holds snapshots taken before a revision session, in insertion order, and reconstructs a
/// plan from one of them on rollback (§4.11).
#[derive(Debug, Default)]
pub struct RevisionHistoryManager {
    snapshots: Vec<PlanSnapshot>,
    next_version: u64,
}

impl RevisionHistoryManager {
    pub fn new() -> Self {
        Self {
            snapshots: Vec::new(),
            next_version: 1,
        }
    }

    /// Captures `plan` under a fresh monotonic version and records it.
    pub fn snapshot(&mut self, plan: &ImplementationPlan, description: impl Into<String>, now: DateTime<Utc>) -> u64 {
        let version = self.next_version;
        self.next_version += 1;
        self.snapshots.push(PlanSnapshot::capture(version, plan, description, now));
        version
    }

    pub fn get(&self, version: u64) -> Option<&PlanSnapshot> {
        self.snapshots.iter().find(|s| s.version == version)
    }

    pub fn snapshots(&self) -> &[PlanSnapshot] {
        &self.snapshots
    }

    /// Reconstructs a plan from the snapshot recorded at `version`. When `preserve_history` is
    /// true, `current_history` (the caller's in-progress revision history) is copied over
    /// intact; otherwise the restored plan's history is truncated to the count recorded at
    /// snapshot time.
    pub fn rollback_to_version(
        &self,
        version: u64,
        current_history: &[AppliedRevision],
        preserve_history: bool,
    ) -> Result<ImplementationPlan, HistoryError> {
        let snapshot = self.get(version).ok_or(HistoryError::UnknownVersion(version))?;
        let mut plan = snapshot.plan.clone();
        if preserve_history {
            plan.revision_history = current_history.to_vec();
        } else {
            let keep = snapshot.revision_count_at_snapshot.min(current_history.len());
            plan.revision_history = current_history[..keep].to_vec();
        }
        Ok(plan)
    }
}

fn sanitize_name(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}

/// Two-JSON-files-per-name persistence for a plan and its history (§4.11). The storage
/// directory is created (with parents) on construction.
pub struct PlanStore {
    dir: PathBuf,
}

impl PlanStore {
    pub fn open(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn plan_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}_plan.json", sanitize_name(name)))
    }

    fn history_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}_history.json", sanitize_name(name)))
    }

    pub fn save_plan(&self, name: &str, plan: &ImplementationPlan) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(plan)?;
        std::fs::write(self.plan_path(name), json)?;
        Ok(())
    }

    pub fn load_plan(&self, name: &str) -> anyhow::Result<Option<ImplementationPlan>> {
        read_json_if_exists(&self.plan_path(name))
    }

    pub fn save_history(&self, name: &str, history: &[AppliedRevision]) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(history)?;
        std::fs::write(self.history_path(name), json)?;
        Ok(())
    }

    pub fn load_history(&self, name: &str) -> anyhow::Result<Option<Vec<AppliedRevision>>> {
        read_json_if_exists(&self.history_path(name))
    }

    /// Logical plan names discovered from `*_plan.json` files in the storage directory.
    pub fn list_plans(&self) -> anyhow::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            if let Some(stripped) = file_name.strip_suffix("_plan.json") {
                names.push(stripped.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn delete_plan(&self, name: &str) -> anyhow::Result<()> {
        for path in [self.plan_path(name), self.history_path(name)] {
            if path.exists() {
                std::fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

fn read_json_if_exists<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

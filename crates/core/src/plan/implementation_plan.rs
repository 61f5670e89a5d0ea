use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::revision::Revision;
use crate::model::PlanFinding;

use super::group::TaskGroup;
use super::task::Task;

/// Record of one revision application, appended into [`ImplementationPlan::revision_history`].
/// Owned by the plan; never mutated once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedRevision {
    pub revision: Revision,
    pub finding: PlanFinding,
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    pub applied_at: DateTime<Utc>,
}

/// An ordered, grouped list of tasks with dependencies and revision history. Created once;
/// mutated only through [`crate::revision::engine::AutoRevisionEngine`]; snapshotted for rollback
/// by [`crate::revision::history::RevisionHistoryManager`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImplementationPlan {
    #[serde(default)]
    pub groups: Vec<TaskGroup>,
    #[serde(default)]
    pub quick_wins: Vec<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub focus_area: String,
    #[serde(default)]
    pub revision_history: Vec<AppliedRevision>,
}

impl ImplementationPlan {
    pub fn all_tasks(&self) -> impl Iterator<Item = &Task> {
        self.groups.iter().flat_map(|g| g.tasks.iter())
    }

    pub fn all_tasks_mut(&mut self) -> impl Iterator<Item = &mut Task> {
        self.groups.iter_mut().flat_map(|g| g.tasks.iter_mut())
    }

    pub fn find_task(&self, id: &str) -> Option<&Task> {
        self.all_tasks().find(|t| t.id == id)
    }

    pub fn find_group_mut(&mut self, scope: &str) -> Option<&mut TaskGroup> {
        self.groups.iter_mut().find(|g| g.scope == scope)
    }

    pub fn task_exists(&self, id: &str) -> bool {
        self.find_task(id).is_some()
    }

    /// Depender depends on dependee: is there already a path dependee -> ... -> depender?
    /// If so, adding `depender -> dependee` would close a cycle.
    pub fn has_path(&self, from: &str, to: &str) -> bool {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(from);
        while let Some(current) = queue.pop_front() {
            if current == to {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(task) = self.find_task(current) {
                for dep in &task.dependencies {
                    queue.push_back(dep.as_str());
                }
            }
        }
        false
    }

    /// No task id collisions, no dependency references to missing tasks, no cycle.
    pub fn is_structurally_valid(&self) -> bool {
        let mut seen = HashSet::new();
        for task in self.all_tasks() {
            if !seen.insert(task.id.as_str()) {
                return false;
            }
        }
        for task in self.all_tasks() {
            for dep in &task.dependencies {
                if !self.task_exists(dep) {
                    return false;
                }
            }
        }
        for task in self.all_tasks() {
            for dep in &task.dependencies {
                if self.has_path(dep, &task.id) {
                    return false;
                }
            }
        }
        true
    }
}

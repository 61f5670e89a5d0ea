use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::plan::task::Task;

/// The five structural mutations an auto-revision can apply to a plan.
///
/// Declared in the order §4.10 mandates revisions are applied within a pass:
/// ADD-TASK before ADD-DEPENDENCY before MODIFY-TASK before REORDER before REMOVE-TASK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RevisionKind {
    AddTask,
    AddDependency,
    ModifyTask,
    Reorder,
    RemoveTask,
}

impl RevisionKind {
    pub fn apply_order_index(self) -> u8 {
        match self {
            RevisionKind::AddTask => 0,
            RevisionKind::AddDependency => 1,
            RevisionKind::ModifyTask => 2,
            RevisionKind::Reorder => 3,
            RevisionKind::RemoveTask => 4,
        }
    }
}

/// A deterministic structural change proposed by a plan rule, consumed once by the
/// auto-revision engine (see [`crate::revision::engine::AutoRevisionEngine`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Revision {
    pub kind: RevisionKind,
    pub rationale: String,
    pub target_task_id: String,
    #[serde(default)]
    pub new_task: Option<Task>,
    #[serde(default)]
    pub field_modifications: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub dependency_additions: Vec<(String, String)>,
}

impl Revision {
    pub fn add_task(rationale: impl Into<String>, target_task_id: impl Into<String>, new_task: Task) -> Self {
        Self {
            kind: RevisionKind::AddTask,
            rationale: rationale.into(),
            target_task_id: target_task_id.into(),
            new_task: Some(new_task),
            field_modifications: HashMap::new(),
            dependency_additions: Vec::new(),
        }
    }

    pub fn modify_task(
        rationale: impl Into<String>,
        target_task_id: impl Into<String>,
        field_modifications: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            kind: RevisionKind::ModifyTask,
            rationale: rationale.into(),
            target_task_id: target_task_id.into(),
            new_task: None,
            field_modifications,
            dependency_additions: Vec::new(),
        }
    }

    pub fn add_dependency(
        rationale: impl Into<String>,
        target_task_id: impl Into<String>,
        depends_on: impl Into<String>,
    ) -> Self {
        Self {
            kind: RevisionKind::AddDependency,
            rationale: rationale.into(),
            target_task_id: target_task_id.into(),
            new_task: None,
            field_modifications: HashMap::new(),
            dependency_additions: vec![(target_task_id_placeholder(), depends_on.into())],
        }
        .with_target(target_task_id)
    }

    fn with_target(mut self, target_task_id: impl Into<String>) -> Self {
        let target = target_task_id.into();
        if let Some((from, _)) = self.dependency_additions.first_mut() {
            *from = target.clone();
        }
        self.target_task_id = target;
        self
    }
}

fn target_task_id_placeholder() -> String {
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_order_matches_spec_sequence() {
        let mut kinds = vec![
            RevisionKind::RemoveTask,
            RevisionKind::Reorder,
            RevisionKind::AddDependency,
            RevisionKind::ModifyTask,
            RevisionKind::AddTask,
        ];
        kinds.sort_by_key(|k| k.apply_order_index());
        assert_eq!(
            kinds,
            vec![
                RevisionKind::AddTask,
                RevisionKind::AddDependency,
                RevisionKind::ModifyTask,
                RevisionKind::Reorder,
                RevisionKind::RemoveTask,
            ]
        );
    }

    #[test]
    fn add_dependency_sets_pair() {
        let rev = Revision::add_dependency("needs db", "T1", "T2");
        assert_eq!(rev.target_task_id, "T1");
        assert_eq!(rev.dependency_additions, vec![("T1".to_string(), "T2".to_string())]);
    }
}

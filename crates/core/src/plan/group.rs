use serde::{Deserialize, Serialize};

use super::task::Task;

/// An ordered list of tasks sharing a scope label. Membership changes only through revisions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskGroup {
    pub scope: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl TaskGroup {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            description: String::new(),
            tasks: Vec::new(),
        }
    }

    pub fn find_task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn find_task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_task_by_id() {
        let mut group = TaskGroup::new("auth");
        group.tasks.push(Task::new("T1", "Implement login"));
        assert!(group.find_task("T1").is_some());
        assert!(group.find_task("T2").is_none());
    }
}

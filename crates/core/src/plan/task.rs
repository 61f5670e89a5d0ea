use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effort {
    Low,
    Medium,
    High,
}

/// Atomic work unit within a plan. Mutated only through the auto-revision engine
/// (see [`crate::revision::engine::AutoRevisionEngine`]); never edited in place by a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default = "default_effort")]
    pub estimated_effort: Effort,
    #[serde(default)]
    pub impact: f64,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    #[serde(default)]
    pub evidence_links: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_priority() -> u8 {
    3
}

fn default_effort() -> Effort {
    Effort::Medium
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            scope: String::new(),
            priority: default_priority(),
            estimated_effort: default_effort(),
            impact: 0.0,
            acceptance_criteria: Vec::new(),
            evidence_links: Vec::new(),
            dependencies: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Text used by keyword-matching rules: title + description, lowercased.
    pub fn searchable_text(&self) -> String {
        format!("{} {}", self.title, self.description).to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let t = Task::new("T1", "Implement feature X");
        assert_eq!(t.priority, 3);
        assert_eq!(t.estimated_effort, Effort::Medium);
        assert!(t.dependencies.is_empty());
    }

    #[test]
    fn missing_fields_default_on_deserialize() {
        let t: Task = serde_json::from_str(r#"{"id":"T1","title":"Implement feature X"}"#).unwrap();
        assert_eq!(t.priority, 3);
        assert_eq!(t.estimated_effort, Effort::Medium);
    }

    #[test]
    fn searchable_text_combines_title_and_description() {
        let mut t = Task::new("T1", "Implement Auth");
        t.description = "Add JWT based login".to_string();
        assert_eq!(t.searchable_text(), "implement auth add jwt based login");
    }
}

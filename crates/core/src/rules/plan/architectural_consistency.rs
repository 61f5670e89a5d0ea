//! §4.9 `PLAN.ARCHITECTURAL_CONSISTENCY`: a task's evidence links (`path[:line]`) should land
//! in the directory/file convention implied by the task's own declared file-type keywords, and
//! a single task shouldn't straddle too many distinct file-types at once.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{Evidence, PlanFinding, Revision, Severity};
use crate::plan::task::Task;
use crate::rule::{PlanRule, PlanRuleContext};

/// (file-type keyword-detector, path pattern the evidence link must match)
static FILE_TYPE_RULES: Lazy<Vec<(&'static str, Regex, Regex)>> = Lazy::new(|| {
    vec![
        ("tests", Regex::new(r"(?i)\btest(s|ing)?\b").unwrap(), Regex::new(r"(?i)(^|/)tests?/|_test\.|\.test\.|test_").unwrap()),
        ("components", Regex::new(r"(?i)\bcomponents?\b").unwrap(), Regex::new(r"(?i)(^|/)components?/").unwrap()),
        ("utils", Regex::new(r"(?i)\butils?\b|\bhelpers?\b").unwrap(), Regex::new(r"(?i)(^|/)(utils?|helpers?)/").unwrap()),
        ("config", Regex::new(r"(?i)\bconfig(uration)?\b").unwrap(), Regex::new(r"(?i)(^|/)config/|\.(toml|ya?ml|ini|env)$").unwrap()),
        ("api", Regex::new(r"(?i)\bapi\b|\broute(s)?\b|\bendpoint\b").unwrap(), Regex::new(r"(?i)(^|/)(api|routes?)/").unwrap()),
        ("models", Regex::new(r"(?i)\bmodels?\b|\bschema(s)?\b").unwrap(), Regex::new(r"(?i)(^|/)models?/").unwrap()),
        ("services", Regex::new(r"(?i)\bservices?\b").unwrap(), Regex::new(r"(?i)(^|/)services?/").unwrap()),
    ]
});

fn detected_file_types(task: &Task) -> Vec<&'static str> {
    let text = task.searchable_text();
    FILE_TYPE_RULES.iter().filter(|(_, keyword, _)| keyword.is_match(&text)).map(|(name, _, _)| *name).collect()
}

fn evidence_path(link: &str) -> &str {
    // Evidence links are `path[:line]`; strip a trailing `:<digits>` if present.
    match link.rsplit_once(':') {
        Some((path, suffix)) if suffix.chars().all(|c| c.is_ascii_digit()) && !suffix.is_empty() => path,
        _ => link,
    }
}

pub struct ArchitecturalConsistencyRule;

impl PlanRule for ArchitecturalConsistencyRule {
    fn rule_id(&self) -> &'static str {
        "PLAN.ARCHITECTURAL_CONSISTENCY"
    }
    fn name(&self) -> &'static str {
        "Architectural consistency"
    }
    fn category(&self) -> &'static str {
        "architecture"
    }
    fn default_severity(&self) -> Severity {
        Severity::Low
    }
    fn description(&self) -> &'static str {
        "Flags evidence links that don't match the task's declared file-type convention, and \
         tasks spanning too many distinct file-types"
    }

    fn validate(&self, context: &PlanRuleContext) -> anyhow::Result<Vec<PlanFinding>> {
        let mut findings = Vec::new();
        for task in context.plan.all_tasks() {
            let file_types = detected_file_types(task);
            if file_types.is_empty() {
                continue;
            }

            for link in &task.evidence_links {
                let path = evidence_path(link);
                let mismatched: Vec<&str> = file_types
                    .iter()
                    .filter(|name| {
                        let (_, _, path_pattern) =
                            FILE_TYPE_RULES.iter().find(|(n, _, _)| n == *name).expect("known file type");
                        !path_pattern.is_match(path)
                    })
                    .copied()
                    .collect();
                // Only a genuine mismatch when every declared file-type disagrees with the path;
                // if any one of the task's file-types matches, the link is consistent with the task.
                if mismatched.len() == file_types.len() {
                    findings.push(self.build_finding(
                        format!(
                            "Evidence link `{link}` in task `{}` doesn't match its declared file-type(s) ({})",
                            task.title,
                            file_types.join(", ")
                        ),
                        vec![task.id.clone()],
                        0.6,
                        "Point the evidence link at a path consistent with the task's file-type, or correct the task description",
                        vec![Evidence::new(format!("evidence link `{link}` doesn't match convention")).with_data("task_id", task.id.clone())],
                        None,
                        None,
                    ));
                }
            }

            if file_types.len() >= 3 {
                findings.push(self.build_finding(
                    format!(
                        "Task `{}` spans {} distinct file-types ({}); consider splitting it",
                        task.title,
                        file_types.len(),
                        file_types.join(", ")
                    ),
                    vec![task.id.clone()],
                    0.5,
                    "Split this task by responsibility/file-type",
                    vec![Evidence::new("task spans 3 or more distinct file-types").with_data("task_id", task.id.clone())],
                    None,
                    Some(Self::split_note_revision(&task.id, &file_types)),
                ));
            }
        }
        Ok(findings)
    }

    fn suggest_revision(&self, finding: &PlanFinding, _context: &PlanRuleContext) -> Option<Revision> {
        if !finding.summary.contains("distinct file-types") {
            // Path-mismatch findings aren't auto-revisable -- only description annotation applies.
            return None;
        }
        let task_id = finding.task_ids.first()?;
        Some(Self::split_note_revision(task_id, &[]))
    }
}

impl ArchitecturalConsistencyRule {
    /// Auto-revision only annotates the description; it never splits tasks (§4.9).
    fn split_note_revision(task_id: &str, file_types: &[&str]) -> Revision {
        let note = if file_types.is_empty() {
            "\n\nConsider splitting this task: it spans multiple distinct file-types.".to_string()
        } else {
            format!("\n\nConsider splitting this task by file-type: {}.", file_types.join(", "))
        };
        let mut fields = std::collections::HashMap::new();
        fields.insert("description_append".to_string(), serde_json::json!(note));
        Revision::modify_task("task spans multiple file-types", task_id, fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{ImplementationPlan, TaskGroup};

    fn plan_with_task(task: Task) -> ImplementationPlan {
        ImplementationPlan {
            groups: vec![TaskGroup {
                scope: "core".to_string(),
                description: String::new(),
                tasks: vec![task],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn mismatched_evidence_link_is_flagged() {
        let mut task = Task::new("T1", "Write tests for login flow");
        task.evidence_links = vec!["src/services/auth.py:12".to_string()];
        let plan = plan_with_task(task);
        let ctx = PlanRuleContext::new(plan, ".");
        let findings = ArchitecturalConsistencyRule.validate(&ctx).unwrap();
        assert!(findings.iter().any(|f| f.summary.contains("doesn't match")));
    }

    #[test]
    fn matching_evidence_link_is_not_flagged() {
        let mut task = Task::new("T1", "Write tests for login flow");
        task.evidence_links = vec!["tests/test_auth.py:12".to_string()];
        let plan = plan_with_task(task);
        let ctx = PlanRuleContext::new(plan, ".");
        let findings = ArchitecturalConsistencyRule.validate(&ctx).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn three_file_types_triggers_split_suggestion() {
        let task = Task::new("T1", "Update the API route, the config, and the service layer");
        let plan = plan_with_task(task);
        let ctx = PlanRuleContext::new(plan, ".");
        let findings = ArchitecturalConsistencyRule.validate(&ctx).unwrap();
        assert!(findings.iter().any(|f| f.summary.contains("distinct file-types")));
    }

    #[test]
    fn two_file_types_does_not_trigger_split_suggestion() {
        let task = Task::new("T1", "Update the API route and the config");
        let plan = plan_with_task(task);
        let ctx = PlanRuleContext::new(plan, ".");
        let findings = ArchitecturalConsistencyRule.validate(&ctx).unwrap();
        assert!(findings.iter().all(|f| !f.summary.contains("distinct file-types")));
    }
}

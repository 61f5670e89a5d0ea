//! §4.9 `PLAN.TEST_REQUIREMENT`: a non-trivial feature task must declare (or depend on) a test
//! task.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{Evidence, PlanFinding, Revision, Severity};
use crate::plan::task::{Effort, Task};
use crate::rule::{PlanRule, PlanRuleContext};

static FEATURE_VERB_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(implement|add|create|build|develop|introduce|design|write)\b").unwrap());
static TRIVIAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(fix typo|rename variable|move file|update comment|bump version)\b").unwrap());
static TEST_TASK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\btest(s|ing)?\b").unwrap());

fn is_test_task(task: &Task) -> bool {
    TEST_TASK_RE.is_match(&task.searchable_text())
        || task.tags.iter().any(|t| t.eq_ignore_ascii_case("test") || t.eq_ignore_ascii_case("testing"))
}

fn has_test_dependent_or_dependency(plan: &crate::plan::ImplementationPlan, task: &Task) -> bool {
    if task.dependencies.iter().any(|dep_id| plan.find_task(dep_id).map(is_test_task).unwrap_or(false)) {
        return true;
    }
    plan.all_tasks()
        .any(|other| other.dependencies.contains(&task.id) && is_test_task(other))
}

pub struct TestRequirementRule;

impl PlanRule for TestRequirementRule {
    fn rule_id(&self) -> &'static str {
        "PLAN.TEST_REQUIREMENT"
    }
    fn name(&self) -> &'static str {
        "Test requirement"
    }
    fn category(&self) -> &'static str {
        "coverage"
    }
    fn default_severity(&self) -> Severity {
        Severity::Medium
    }
    fn description(&self) -> &'static str {
        "Flags non-trivial feature tasks with no declared or dependent test task"
    }

    fn validate(&self, context: &PlanRuleContext) -> anyhow::Result<Vec<PlanFinding>> {
        let mut findings = Vec::new();
        for task in context.plan.all_tasks() {
            let text = task.searchable_text();
            if !FEATURE_VERB_RE.is_match(&text) || TRIVIAL_RE.is_match(&text) || is_test_task(task) {
                continue;
            }
            if has_test_dependent_or_dependency(&context.plan, task) {
                continue;
            }
            findings.push(self.build_finding(
                format!("Task `{}` introduces new behaviour with no associated test task", task.title),
                vec![task.id.clone()],
                0.75,
                "Add a dependent test task covering this change",
                vec![Evidence::new("feature task without a test task").with_data("task_id", task.id.clone())],
                None,
                self.suggest_revision_for(task),
            ));
        }
        Ok(findings)
    }

    fn suggest_revision(&self, finding: &PlanFinding, context: &PlanRuleContext) -> Option<Revision> {
        let task_id = finding.task_ids.first()?;
        let task = context.plan.find_task(task_id)?;
        Some(Self::test_task_revision(task))
    }
}

impl TestRequirementRule {
    fn suggest_revision_for(&self, task: &Task) -> Option<Revision> {
        Some(Self::test_task_revision(task))
    }

    fn test_task_revision(task: &Task) -> Revision {
        let mut new_task = Task::new(format!("TASK-TST-{}", task.id), format!("Add tests for {}", task.title));
        new_task.scope = task.scope.clone();
        new_task.priority = task.priority.saturating_add(1).min(5);
        new_task.estimated_effort = Effort::Low;
        new_task.acceptance_criteria = vec![
            "Covers the happy path".to_string(),
            "Covers at least one edge case or failure mode".to_string(),
        ];
        new_task.tags = vec!["testing".to_string()];
        new_task.dependencies = vec![task.id.clone()];
        Revision::add_task(
            format!("`{}` has no associated test coverage", task.title),
            new_task.id.clone(),
            new_task,
        )
    }
}

//! §4.9 `PLAN.DOC_REQUIREMENT`: a user-facing change task must declare (or depend on) a
//! documentation task. Mirrors [`super::test_requirement`]'s shape with a different keyword set.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{Evidence, PlanFinding, Revision, Severity};
use crate::plan::task::{Effort, Task};
use crate::plan::ImplementationPlan;
use crate::rule::{PlanRule, PlanRuleContext};

static USER_FACING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(api|user|interface|config|cli|route|ui|frontend|endpoint|public)\b").unwrap());
static ACTION_VERB_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(implement|add|create|build|change|update|expose|introduce)\b").unwrap());
static DOC_TASK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bdoc(s|umentation)?\b").unwrap());

fn is_doc_task(task: &Task) -> bool {
    DOC_TASK_RE.is_match(&task.searchable_text()) || task.tags.iter().any(|t| t.eq_ignore_ascii_case("docs"))
}

fn has_doc_dependent_or_dependency(plan: &ImplementationPlan, task: &Task) -> bool {
    if task.dependencies.iter().any(|dep_id| plan.find_task(dep_id).map(is_doc_task).unwrap_or(false)) {
        return true;
    }
    plan.all_tasks()
        .any(|other| other.dependencies.contains(&task.id) && is_doc_task(other))
}

pub struct DocRequirementRule;

impl PlanRule for DocRequirementRule {
    fn rule_id(&self) -> &'static str {
        "PLAN.DOC_REQUIREMENT"
    }
    fn name(&self) -> &'static str {
        "Documentation requirement"
    }
    fn category(&self) -> &'static str {
        "coverage"
    }
    fn default_severity(&self) -> Severity {
        Severity::Low
    }
    fn description(&self) -> &'static str {
        "Flags user-facing change tasks with no declared or dependent documentation task"
    }

    fn validate(&self, context: &PlanRuleContext) -> anyhow::Result<Vec<PlanFinding>> {
        let mut findings = Vec::new();
        for task in context.plan.all_tasks() {
            let text = task.searchable_text();
            if !USER_FACING_RE.is_match(&text) || !ACTION_VERB_RE.is_match(&text) || is_doc_task(task) {
                continue;
            }
            if has_doc_dependent_or_dependency(&context.plan, task) {
                continue;
            }
            findings.push(self.build_finding(
                format!("User-facing task `{}` has no associated documentation task", task.title),
                vec![task.id.clone()],
                0.7,
                "Add a dependent documentation task covering this change",
                vec![Evidence::new("user-facing task without a docs task").with_data("task_id", task.id.clone())],
                None,
                Some(Self::doc_task_revision(task)),
            ));
        }
        Ok(findings)
    }

    fn suggest_revision(&self, finding: &PlanFinding, context: &PlanRuleContext) -> Option<Revision> {
        let task_id = finding.task_ids.first()?;
        let task = context.plan.find_task(task_id)?;
        Some(Self::doc_task_revision(task))
    }
}

impl DocRequirementRule {
    fn doc_task_revision(task: &Task) -> Revision {
        let mut new_task = Task::new(format!("{}-DOCS", task.id), format!("Document {}", task.title));
        new_task.scope = task.scope.clone();
        new_task.priority = task.priority.saturating_add(1).min(5);
        new_task.estimated_effort = Effort::Low;
        new_task.acceptance_criteria = vec!["Describes the change for an external consumer".to_string()];
        new_task.tags = vec!["docs".to_string()];
        new_task.dependencies = vec![task.id.clone()];
        Revision::add_task(
            format!("`{}` is user-facing but has no documentation task", task.title),
            new_task.id.clone(),
            new_task,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::TaskGroup;

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
    fn api_change_without_docs_is_flagged() {
        let plan = plan_with_task(Task::new("T1", "Add new public API endpoint"));
        let ctx = PlanRuleContext::new(plan, ".");
        let findings = DocRequirementRule.validate(&ctx).unwrap();
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn internal_refactor_is_not_flagged() {
        let plan = plan_with_task(Task::new("T1", "Refactor internal cache eviction logic"));
        let ctx = PlanRuleContext::new(plan, ".");
        let findings = DocRequirementRule.validate(&ctx).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn task_with_doc_dependency_is_not_flagged() {
        let mut feature = Task::new("T1", "Add new public API endpoint");
        feature.dependencies = vec!["T1-DOCS".to_string()];
        let mut doc_task = Task::new("T1-DOCS", "Write docs for new endpoint");
        doc_task.tags = vec!["docs".to_string()];
        let plan = ImplementationPlan {
            groups: vec![TaskGroup {
                scope: "core".to_string(),
                description: String::new(),
                tasks: vec![feature, doc_task],
            }],
            ..Default::default()
        };
        let ctx = PlanRuleContext::new(plan, ".");
        let findings = DocRequirementRule.validate(&ctx).unwrap();
        assert!(findings.is_empty());
    }
}

//! §4.10: applies plan-rule-suggested [`Revision`]s to an [`ImplementationPlan`] under
//! conflict/cycle checks, in severity-then-kind order, across a bounded number of retry
//! iterations so a later iteration can pick up a revision blocked only by ordering (e.g. an
//! ADD-DEPENDENCY targeting a task an earlier ADD-TASK in the same pass introduces).

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::ConfigError;
use crate::model::revision::{Revision, RevisionKind};
use crate::model::PlanFinding;
use crate::plan::group::TaskGroup;
use crate::plan::implementation_plan::AppliedRevision;
use crate::plan::task::Task;
use crate::plan::ImplementationPlan;

fn default_min_confidence() -> f64 {
    0.7
}

fn default_max_iterations() -> u32 {
    3
}

fn default_max_revisions_per_plan() -> usize {
    50
}

/// Knobs controlling which findings the engine is willing to act on and how hard it retries
/// (§4.10, §7's "bounded numerics validated at construction").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoRevisionConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_max_revisions_per_plan")]
    pub max_revisions_per_plan: usize,
    #[serde(default)]
    pub disabled_rules: HashSet<String>,
}

fn default_enabled() -> bool {
    true
}

impl Default for AutoRevisionConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            min_confidence: default_min_confidence(),
            max_iterations: default_max_iterations(),
            max_revisions_per_plan: default_max_revisions_per_plan(),
            disabled_rules: HashSet::new(),
        }
    }
}

impl AutoRevisionConfig {
    pub fn validated(self) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ConfigError::OutOfRange {
                field: "min_confidence",
                value: self.min_confidence,
                min: 0.0,
                max: 1.0,
            });
        }
        if !(1..=10).contains(&self.max_iterations) {
            return Err(ConfigError::OutOfRange {
                field: "max_iterations",
                value: self.max_iterations as f64,
                min: 1.0,
                max: 10.0,
            });
        }
        if !(1..=50).contains(&self.max_revisions_per_plan) {
            return Err(ConfigError::OutOfRange {
                field: "max_revisions_per_plan",
                value: self.max_revisions_per_plan as f64,
                min: 1.0,
                max: 50.0,
            });
        }
        Ok(self)
    }
}

/// Outcome of [`AutoRevisionEngine::apply`]: the revised plan, what was applied, what was
/// rejected (and why), and how much work it took.
#[derive(Debug, Clone)]
pub struct AutoRevisionResult {
    pub plan: ImplementationPlan,
    pub applied: Vec<AppliedRevision>,
    pub skipped: Vec<(Revision, String)>,
    pub iterations_used: u32,
    pub elapsed: Duration,
}

impl AutoRevisionResult {
    /// Human-readable summary of what happened, grouped applied-then-skipped (§4.10's
    /// "audit markdown" formatter).
    pub fn audit_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "# Auto-revision audit\n\n{} applied, {} skipped, {} iteration(s)\n\n",
            self.applied.len(),
            self.skipped.len(),
            self.iterations_used
        ));
        out.push_str("## Applied\n\n");
        if self.applied.is_empty() {
            out.push_str("_none_\n\n");
        } else {
            for a in &self.applied {
                out.push_str(&format!(
                    "- `{:?}` on `{}` -- {}\n",
                    a.revision.kind, a.revision.target_task_id, a.revision.rationale
                ));
            }
            out.push('\n');
        }
        out.push_str("## Skipped\n\n");
        if self.skipped.is_empty() {
            out.push_str("_none_\n");
        } else {
            for (revision, reason) in &self.skipped {
                out.push_str(&format!(
                    "- `{:?}` on `{}` -- {}\n",
                    revision.kind, revision.target_task_id, reason
                ));
            }
        }
        out
    }
}

/// §4.10: applies findings' suggested revisions to a plan, operating on a deep copy that
/// replaces the working plan only on success (§9's "deep copy of plans for revisions").
pub struct AutoRevisionEngine {
    config: AutoRevisionConfig,
}

impl AutoRevisionEngine {
    pub fn new(config: AutoRevisionConfig) -> Self {
        Self { config }
    }

    fn is_eligible(&self, finding: &PlanFinding) -> bool {
        self.config.enabled
            && finding.can_auto_revise()
            && finding.confidence >= self.config.min_confidence
            && !self.config.disabled_rules.contains(&finding.rule_id)
    }

    pub fn apply(&self, plan: &ImplementationPlan, findings: &[PlanFinding], now: DateTime<Utc>) -> AutoRevisionResult {
        let started = Instant::now();
        let mut working = plan.clone();
        let mut applied = Vec::new();
        let mut last_error: HashMap<usize, String> = HashMap::new();

        let mut pending: Vec<usize> = findings
            .iter()
            .enumerate()
            .filter(|(_, f)| self.is_eligible(f))
            .map(|(i, _)| i)
            .collect();

        let mut iterations_used = 0u32;
        let mut cap_hit = false;

        'outer: for _iteration in 0..self.config.max_iterations {
            iterations_used += 1;
            pending.sort_by_key(|&i| {
                let finding = &findings[i];
                let revision = finding.revision.as_ref().expect("eligible finding carries a revision");
                (finding.severity.revision_order_index(), revision.kind.apply_order_index())
            });

            let mut next_pending = Vec::new();
            let mut made_progress = false;

            for (pos, &i) in pending.iter().enumerate() {
                if applied.len() >= self.config.max_revisions_per_plan {
                    cap_hit = true;
                    next_pending.extend_from_slice(&pending[pos..]);
                    break;
                }
                let finding = &findings[i];
                let revision = finding.revision.as_ref().expect("eligible finding carries a revision");
                match try_apply(&mut working, revision) {
                    Ok(()) => {
                        made_progress = true;
                        applied.push(AppliedRevision {
                            revision: revision.clone(),
                            finding: finding.clone(),
                            success: true,
                            error: None,
                            applied_at: now,
                        });
                    }
                    Err(reason) => {
                        last_error.insert(i, reason);
                        next_pending.push(i);
                    }
                }
            }

            pending = next_pending;
            if cap_hit {
                break 'outer;
            }
            if pending.is_empty() || !made_progress {
                break;
            }
        }

        let cap_reason = format!("plan revision cap of {} reached", self.config.max_revisions_per_plan);
        let skipped: Vec<(Revision, String)> = pending
            .into_iter()
            .map(|i| {
                let finding = &findings[i];
                let revision = finding.revision.clone().expect("eligible finding carries a revision");
                let reason = last_error
                    .remove(&i)
                    .unwrap_or_else(|| if cap_hit { cap_reason.clone() } else { "not processed".to_string() });
                (revision, reason)
            })
            .collect();

        prune_dangling_dependencies(&mut working);

        AutoRevisionResult {
            plan: working,
            applied,
            skipped,
            iterations_used,
            elapsed: started.elapsed(),
        }
    }
}

fn try_apply(plan: &mut ImplementationPlan, revision: &Revision) -> Result<(), String> {
    match revision.kind {
        RevisionKind::AddTask => apply_add_task(plan, revision),
        RevisionKind::AddDependency => apply_add_dependency(plan, revision),
        RevisionKind::ModifyTask => apply_modify_task(plan, revision),
        RevisionKind::Reorder => apply_reorder(plan, revision),
        RevisionKind::RemoveTask => apply_remove_task(plan, revision),
    }
}

fn apply_add_task(plan: &mut ImplementationPlan, revision: &Revision) -> Result<(), String> {
    let new_task = revision
        .new_task
        .clone()
        .ok_or_else(|| "ADD-TASK revision has no new_task payload".to_string())?;
    if plan.task_exists(&new_task.id) {
        return Err(format!("task id `{}` already exists", new_task.id));
    }
    let scope = new_task.scope.clone();
    match plan.find_group_mut(&scope) {
        Some(group) => group.tasks.push(new_task),
        None => plan.groups.push(TaskGroup {
            scope,
            description: String::new(),
            tasks: vec![new_task],
        }),
    }
    Ok(())
}

fn apply_add_dependency(plan: &mut ImplementationPlan, revision: &Revision) -> Result<(), String> {
    let (depender, dependee) = revision
        .dependency_additions
        .first()
        .cloned()
        .ok_or_else(|| "ADD-DEPENDENCY revision has no dependency pair".to_string())?;
    if depender == dependee {
        return Err("self-dependency rejected".to_string());
    }
    if !plan.task_exists(&depender) {
        return Err(format!("missing task `{depender}`"));
    }
    if !plan.task_exists(&dependee) {
        return Err(format!("missing task `{dependee}`"));
    }
    // depender -> dependee would close a cycle if dependee already (transitively) depends on depender.
    if plan.has_path(&dependee, &depender) {
        return Err("would create a dependency cycle".to_string());
    }
    let task = plan
        .all_tasks_mut()
        .find(|t| t.id == depender)
        .expect("existence checked above");
    if !task.dependencies.contains(&dependee) {
        task.dependencies.push(dependee);
    }
    Ok(())
}

fn apply_modify_task(plan: &mut ImplementationPlan, revision: &Revision) -> Result<(), String> {
    let task = plan
        .all_tasks_mut()
        .find(|t| t.id == revision.target_task_id)
        .ok_or_else(|| format!("missing task `{}`", revision.target_task_id))?;
    apply_field_modifications(task, &revision.field_modifications);
    Ok(())
}

fn apply_reorder(plan: &mut ImplementationPlan, revision: &Revision) -> Result<(), String> {
    let task = plan
        .all_tasks_mut()
        .find(|t| t.id == revision.target_task_id)
        .ok_or_else(|| format!("missing task `{}`", revision.target_task_id))?;
    if let Some(value) = revision.field_modifications.get("priority") {
        if let Some(n) = value.as_u64() {
            task.priority = n.min(u8::MAX as u64) as u8;
        }
    }
    Ok(())
}

fn apply_remove_task(plan: &mut ImplementationPlan, revision: &Revision) -> Result<(), String> {
    let id = &revision.target_task_id;
    if !plan.task_exists(id) {
        return Err(format!("missing task `{id}`"));
    }
    for group in plan.groups.iter_mut() {
        group.tasks.retain(|t| &t.id != id);
    }
    plan.quick_wins.retain(|q| q != id);
    Ok(())
}

/// Applies `field_modifications` by attribute assignment, silently ignoring unknown keys
/// (§4.10), special-casing the two append-style keys several plan rules emit instead of a
/// plain field overwrite.
fn apply_field_modifications(task: &mut Task, modifications: &HashMap<String, serde_json::Value>) {
    for (key, value) in modifications {
        match key.as_str() {
            "description_append" => {
                if let Some(addition) = value.as_str() {
                    if !task.description.is_empty() {
                        task.description.push(' ');
                    }
                    task.description.push_str(addition);
                }
            }
            "acceptance_criteria_append" => {
                if let Some(items) = value.as_array() {
                    task.acceptance_criteria
                        .extend(items.iter().filter_map(|v| v.as_str()).map(str::to_string));
                }
            }
            "title" => {
                if let Some(s) = value.as_str() {
                    task.title = s.to_string();
                }
            }
            "description" => {
                if let Some(s) = value.as_str() {
                    task.description = s.to_string();
                }
            }
            "scope" => {
                if let Some(s) = value.as_str() {
                    task.scope = s.to_string();
                }
            }
            "priority" => {
                if let Some(n) = value.as_u64() {
                    task.priority = n.min(u8::MAX as u64) as u8;
                }
            }
            "estimated_effort" => {
                if let Ok(effort) = serde_json::from_value(value.clone()) {
                    task.estimated_effort = effort;
                }
            }
            "impact" => {
                if let Some(n) = value.as_f64() {
                    task.impact = n;
                }
            }
            "acceptance_criteria" => {
                if let Some(items) = value.as_array() {
                    task.acceptance_criteria = items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect();
                }
            }
            "evidence_links" => {
                if let Some(items) = value.as_array() {
                    task.evidence_links = items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect();
                }
            }
            "dependencies" => {
                if let Some(items) = value.as_array() {
                    task.dependencies = items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect();
                }
            }
            "tags" => {
                if let Some(items) = value.as_array() {
                    task.tags = items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect();
                }
            }
            _ => {}
        }
    }
}

fn prune_dangling_dependencies(plan: &mut ImplementationPlan) {
    let valid_ids: HashSet<String> = plan.all_tasks().map(|t| t.id.clone()).collect();
    for task in plan.all_tasks_mut() {
        task.dependencies.retain(|dep| valid_ids.contains(dep));
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::implementation_plan::ImplementationPlan;

/// A serialised plan captured before a revision session, enabling rollback. The embedded
/// plan's `revision_history` is always empty; `revision_count_at_snapshot` records the count
/// that was stripped so [`crate::revision::history::RevisionHistoryManager::rollback_to_version`]
/// can truncate a caller's history to match when asked not to preserve it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSnapshot {
    pub version: u64,
    pub plan: ImplementationPlan,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub revision_count_at_snapshot: usize,
}

impl PlanSnapshot {
    pub fn capture(version: u64, plan: &ImplementationPlan, description: impl Into<String>, now: DateTime<Utc>) -> Self {
        let mut stripped = plan.clone();
        let revision_count_at_snapshot = stripped.revision_history.len();
        stripped.revision_history.clear();
        Self {
            version,
            plan: stripped,
            description: description.into(),
            created_at: now,
            revision_count_at_snapshot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::group::TaskGroup;
    use crate::plan::task::Task;

    #[test]
    fn capture_strips_revision_history_but_records_its_length() {
        let mut plan = ImplementationPlan {
            groups: vec![TaskGroup::new("core")],
            ..Default::default()
        };
        plan.groups[0].tasks.push(Task::new("T1", "t"));
        // Pretend two revisions were already applied.
        plan.revision_history.push(crate::plan::implementation_plan::AppliedRevision {
            revision: crate::model::Revision::add_dependency("x", "T1", "T1"),
            finding: dummy_finding(),
            success: true,
            error: None,
            applied_at: Utc::now(),
        });

        let snap = PlanSnapshot::capture(1, &plan, "before auto-revise", Utc::now());
        assert!(snap.plan.revision_history.is_empty());
        assert_eq!(snap.revision_count_at_snapshot, 1);
        assert_eq!(snap.plan.groups[0].tasks.len(), 1);
    }

    fn dummy_finding() -> crate::model::PlanFinding {
        crate::model::PlanFinding {
            rule_id: "PLAN.TEST_REQUIREMENT".to_string(),
            severity: crate::model::Severity::Medium,
            summary: "s".to_string(),
            task_ids: vec![],
            suggestion: String::new(),
            auto_revisable: true,
            confidence: 0.9,
            evidence: vec![],
            revision: None,
            created_at: Utc::now(),
        }
    }
}

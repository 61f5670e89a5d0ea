//! §4.9 `PLAN.DUPLICATE_DETECTION`: for each creation task, query the configured vector-store
//! client for similar existing entities. The only non-fast plan rule -- it performs a remote
//! call through [`crate::similarity::SimilaritySearch`], so the fast path (`run_fast`) skips it.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{Evidence, PlanFinding, Revision, Severity};
use crate::rule::{PlanRule, PlanRuleContext};
use crate::similarity::SimilarityResult;

const DEFAULT_THRESHOLD: f64 = 0.70;
const SEARCH_LIMIT: usize = 5;
const ENTITY_TYPES: &[&str] = &["function", "class", "implementation_pattern"];

static CREATION_VERB_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(implement|add|create|build|introduce|write)\b").unwrap());

pub struct DuplicateDetectionRule {
    threshold: f64,
}

impl Default for DuplicateDetectionRule {
    fn default() -> Self {
        Self { threshold: DEFAULT_THRESHOLD }
    }
}

impl DuplicateDetectionRule {
    pub fn with_threshold(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Bridges the async `SimilaritySearch` collaborator into `PlanRule::validate`'s
    /// synchronous contract. Absorbs a missing client, or a search failure, into an empty
    /// result -- §4.9: "degrades to no findings, never an error".
    fn search_similar(&self, context: &PlanRuleContext, query: &str) -> Vec<SimilarityResult> {
        let Some(client) = context.search_client.clone() else {
            return Vec::new();
        };
        let collection = context.collection_name.clone();
        let query = query.to_string();
        let fut = async move { client.search(&collection, &query, SEARCH_LIMIT).await };
        let outcome = match tokio::runtime::Handle::try_current() {
            Ok(handle) => tokio::task::block_in_place(|| handle.block_on(fut)),
            Err(_) => return Vec::new(),
        };
        match outcome {
            Ok(results) => results
                .into_iter()
                .filter(|r| ENTITY_TYPES.contains(&r.entity_type.as_str()))
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "similarity search failed, treating as no duplicates");
                Vec::new()
            }
        }
    }
}

impl PlanRule for DuplicateDetectionRule {
    fn rule_id(&self) -> &'static str {
        "PLAN.DUPLICATE_DETECTION"
    }
    fn name(&self) -> &'static str {
        "Duplicate implementation"
    }
    fn category(&self) -> &'static str {
        "consistency"
    }
    fn default_severity(&self) -> Severity {
        Severity::Medium
    }
    fn is_fast(&self) -> bool {
        false
    }
    fn description(&self) -> &'static str {
        "Flags creation tasks that closely match an existing similar entity in the vector store"
    }

    fn validate(&self, context: &PlanRuleContext) -> anyhow::Result<Vec<PlanFinding>> {
        let mut findings = Vec::new();
        for task in context.plan.all_tasks() {
            let text = task.searchable_text();
            if !CREATION_VERB_RE.is_match(&text) {
                continue;
            }
            let query = format!("{} {}", task.title, task.description);
            let mut results = self.search_similar(context, &query);
            results.retain(|r| r.score >= self.threshold);
            if results.is_empty() {
                continue;
            }
            results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
            let confidence = results[0].score.min(0.95);
            let evidence = results
                .iter()
                .take(3)
                .map(|r| {
                    Evidence::new(format!("similar {} `{}` in {}", r.entity_type, r.name, r.file_path))
                        .with_data("score", r.score)
                        .with_data("entity_type", r.entity_type.clone())
                        .with_data("file_path", r.file_path.clone())
                })
                .collect();
            findings.push(self.build_finding(
                format!("Task `{}` may duplicate an existing implementation", task.title),
                vec![task.id.clone()],
                confidence,
                "Check the most similar existing entities before implementing from scratch",
                evidence,
                None,
                Some(Self::duplicate_note_revision(&task.id, &results[0].name)),
            ));
        }
        Ok(findings)
    }

    fn suggest_revision(&self, finding: &PlanFinding, _context: &PlanRuleContext) -> Option<Revision> {
        let task_id = finding.task_ids.first()?;
        let name = finding.evidence.first().map(|e| e.description.clone()).unwrap_or_default();
        Some(Self::duplicate_note_revision(task_id, &name))
    }
}

impl DuplicateDetectionRule {
    fn duplicate_note_revision(task_id: &str, similar_name: &str) -> Revision {
        let mut fields = std::collections::HashMap::new();
        fields.insert(
            "description_append".to_string(),
            serde_json::json!(format!("\n\nCheck for existing implementation similar to `{similar_name}` before writing new code.")),
        );
        fields.insert(
            "acceptance_criteria_append".to_string(),
            serde_json::json!(["Confirmed no existing implementation can be reused"]),
        );
        Revision::modify_task("possible duplicate of an existing entity", task_id, fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{ImplementationPlan, Task, TaskGroup};
    use crate::similarity::FixedSimilaritySearch;
    use std::sync::Arc;

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

    #[tokio::test(flavor = "multi_thread")]
    async fn similar_entity_above_threshold_is_flagged() {
        let plan = plan_with_task(Task::new("T1", "Implement AuthService for login"));
        let client = Arc::new(FixedSimilaritySearch {
            results: vec![SimilarityResult {
                score: 0.91,
                name: "AuthService".to_string(),
                entity_type: "class".to_string(),
                file_path: "src/auth.py".to_string(),
                content: String::new(),
            }],
        });
        let ctx = PlanRuleContext::new(plan, ".").with_search_client(client, "entities");
        let rule = DuplicateDetectionRule::default();
        let findings = tokio::task::spawn_blocking(move || rule.validate(&ctx)).await.unwrap().unwrap();
        assert_eq!(findings.len(), 1);
        assert!(findings[0].confidence <= 0.95);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn no_client_degrades_to_empty() {
        let plan = plan_with_task(Task::new("T1", "Implement AuthService for login"));
        let ctx = PlanRuleContext::new(plan, ".");
        let rule = DuplicateDetectionRule::default();
        let findings = tokio::task::spawn_blocking(move || rule.validate(&ctx)).await.unwrap().unwrap();
        assert!(findings.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn below_threshold_result_is_not_flagged() {
        let plan = plan_with_task(Task::new("T1", "Implement AuthService for login"));
        let client = Arc::new(FixedSimilaritySearch {
            results: vec![SimilarityResult {
                score: 0.4,
                name: "AuthService".to_string(),
                entity_type: "class".to_string(),
                file_path: "src/auth.py".to_string(),
                content: String::new(),
            }],
        });
        let ctx = PlanRuleContext::new(plan, ".").with_search_client(client, "entities");
        let rule = DuplicateDetectionRule::default();
        let findings = tokio::task::spawn_blocking(move || rule.validate(&ctx)).await.unwrap().unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn non_creation_task_is_not_queried() {
        let plan = plan_with_task(Task::new("T1", "Refactor existing AuthService internals"));
        let ctx = PlanRuleContext::new(plan, ".");
        let rule = DuplicateDetectionRule::default();
        let findings = rule.validate(&ctx).unwrap();
        assert!(findings.is_empty());
    }
}

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::model::{PlanFinding, Severity};
use crate::rule::registry::PlanRuleRegistry;
use crate::rule::PlanRuleContext;

use super::code_engine::ConfigError;

fn default_worker_count() -> usize {
    4
}

fn default_min_confidence() -> f64 {
    0.5
}

fn default_max_findings_per_rule() -> usize {
    20
}

/// Category-toggle config mirroring §4.8: coverage/consistency/architecture/performance can
/// each be disabled without changing the rule registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanGuardrailConfig {
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    #[serde(default = "default_max_findings_per_rule")]
    pub max_findings_per_rule: usize,
    #[serde(default)]
    pub disabled_categories: HashSet<String>,
    #[serde(default)]
    pub severity_overrides: HashMap<String, Severity>,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
}

impl Default for PlanGuardrailConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            max_findings_per_rule: default_max_findings_per_rule(),
            disabled_categories: HashSet::new(),
            severity_overrides: HashMap::new(),
            parallel: false,
            worker_count: default_worker_count(),
        }
    }
}

impl PlanGuardrailConfig {
    pub fn validated(self) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ConfigError::OutOfRange {
                field: "min_confidence",
                value: self.min_confidence,
                min: 0.0,
                max: 1.0,
            });
        }
        if !(1..=64).contains(&self.worker_count) {
            return Err(ConfigError::OutOfRange {
                field: "worker_count",
                value: self.worker_count as f64,
                min: 1.0,
                max: 64.0,
            });
        }
        Ok(self)
    }
}

#[derive(Debug, Clone)]
pub struct PlanEngineResult {
    pub findings: Vec<PlanFinding>,
    pub rules_executed: usize,
    pub rules_skipped: usize,
    pub elapsed: Duration,
    pub errors: Vec<(String, String)>,
}

impl PlanEngineResult {
    pub fn should_warn(&self) -> bool {
        !self.findings.is_empty()
    }
}

/// Runs plan-validation rules over a structured plan (§4.8). Sequential by default; an
/// optional parallel mode fans out rule evaluations across a bounded `tokio::task::JoinSet`
/// worker pool and is semantically equivalent up to ordering (§5): results are re-sorted into
/// encounter order before the same confidence/cap filtering sequential mode applies.
pub struct PlanGuardrailEngine {
    registry: Arc<PlanRuleRegistry>,
    config: PlanGuardrailConfig,
}

impl PlanGuardrailEngine {
    pub fn new(registry: PlanRuleRegistry, config: PlanGuardrailConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            config,
        }
    }

    pub fn registry(&self) -> &PlanRuleRegistry {
        &self.registry
    }

    pub async fn run(&self, context: &PlanRuleContext) -> PlanEngineResult {
        if self.config.parallel {
            self.run_parallel(context, false).await
        } else {
            self.run_sequential(context, false)
        }
    }

    /// Restricts to `is_fast=true` rules, i.e. excludes `PLAN.DUPLICATE_DETECTION`.
    pub async fn run_fast(&self, context: &PlanRuleContext) -> PlanEngineResult {
        if self.config.parallel {
            self.run_parallel(context, true).await
        } else {
            self.run_sequential(context, true)
        }
    }

    fn eligible_indices(&self, fast_only: bool) -> Vec<usize> {
        self.registry
            .rules()
            .iter()
            .enumerate()
            .filter(|(_, rule)| {
                !self.config.disabled_categories.contains(rule.category()) && (!fast_only || rule.is_fast())
            })
            .map(|(i, _)| i)
            .collect()
    }

    fn run_sequential(&self, context: &PlanRuleContext, fast_only: bool) -> PlanEngineResult {
        let started = Instant::now();
        let total = self.registry.len();
        let eligible = self.eligible_indices(fast_only);
        let mut findings = Vec::new();
        let mut errors = Vec::new();

        for &idx in &eligible {
            let rule = &self.registry.rules()[idx];
            let rule_started = Instant::now();
            let outcome = rule.validate(context);
            let elapsed_ms = rule_started.elapsed().as_millis() as u64;
            match outcome {
                Ok(rule_findings) => {
                    tracing::debug!(
                        rule_id = rule.rule_id(),
                        elapsed_ms,
                        finding_count = rule_findings.len(),
                        "plan rule executed"
                    );
                    findings.extend(self.filter_rule_findings(rule.rule_id(), rule_findings));
                }
                Err(e) => {
                    tracing::warn!(rule_id = rule.rule_id(), error = %e, "plan rule failed");
                    errors.push((rule.rule_id().to_string(), e.to_string()));
                }
            }
        }

        PlanEngineResult {
            findings,
            rules_executed: eligible.len(),
            rules_skipped: total - eligible.len(),
            elapsed: started.elapsed(),
            errors,
        }
    }

    async fn run_parallel(&self, context: &PlanRuleContext, fast_only: bool) -> PlanEngineResult {
        let started = Instant::now();
        let total = self.registry.len();
        let eligible = self.eligible_indices(fast_only);
        let mut join_set: JoinSet<(usize, anyhow::Result<Vec<PlanFinding>>)> = JoinSet::new();
        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.config.worker_count.max(1)));

        for &idx in &eligible {
            let registry = Arc::clone(&self.registry);
            let context = context.clone();
            let permit = Arc::clone(&semaphore);
            join_set.spawn(async move {
                let _permit = permit.acquire_owned().await.expect("semaphore not closed");
                let rule = &registry.rules()[idx];
                (idx, rule.validate(&context))
            });
        }

        let mut by_index: HashMap<usize, anyhow::Result<Vec<PlanFinding>>> = HashMap::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((idx, outcome)) => {
                    by_index.insert(idx, outcome);
                }
                Err(join_err) => {
                    tracing::warn!(error = %join_err, "plan rule task panicked");
                }
            }
        }

        // Re-sort into encounter order before filtering, regardless of completion order.
        let mut findings = Vec::new();
        let mut errors = Vec::new();
        for &idx in &eligible {
            let rule = &self.registry.rules()[idx];
            match by_index.remove(&idx) {
                Some(Ok(rule_findings)) => {
                    findings.extend(self.filter_rule_findings(rule.rule_id(), rule_findings));
                }
                Some(Err(e)) => {
                    errors.push((rule.rule_id().to_string(), e.to_string()));
                }
                None => {
                    errors.push((rule.rule_id().to_string(), "rule task did not complete".to_string()));
                }
            }
        }

        PlanEngineResult {
            findings,
            rules_executed: eligible.len(),
            rules_skipped: total - eligible.len(),
            elapsed: started.elapsed(),
            errors,
        }
    }

    fn filter_rule_findings(&self, rule_id: &str, mut rule_findings: Vec<PlanFinding>) -> Vec<PlanFinding> {
        for f in rule_findings.iter_mut() {
            if let Some(&sev) = self.config.severity_overrides.get(rule_id) {
                f.severity = sev;
            }
        }
        rule_findings
            .into_iter()
            .filter(|f| f.confidence >= self.config.min_confidence)
            .take(self.config.max_findings_per_rule)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Evidence;
    use crate::plan::ImplementationPlan;
    use crate::rule::registry::PlanRuleRegistry;
    use crate::rule::PlanRule;

    struct FixedFindingsRule {
        id: &'static str,
        category: &'static str,
        fast: bool,
        count: usize,
    }

    impl PlanRule for FixedFindingsRule {
        fn rule_id(&self) -> &'static str {
            self.id
        }
        fn name(&self) -> &'static str {
            self.id
        }
        fn category(&self) -> &'static str {
            self.category
        }
        fn default_severity(&self) -> Severity {
            Severity::Medium
        }
        fn is_fast(&self) -> bool {
            self.fast
        }
        fn description(&self) -> &'static str {
            "fixed"
        }
        fn validate(&self, _context: &PlanRuleContext) -> anyhow::Result<Vec<PlanFinding>> {
            Ok((0..self.count)
                .map(|i| PlanFinding {
                    rule_id: self.id.to_string(),
                    severity: Severity::Medium,
                    summary: format!("finding {i}"),
                    task_ids: vec!["T1".to_string()],
                    suggestion: String::new(),
                    auto_revisable: false,
                    confidence: 0.9,
                    evidence: vec![Evidence::new("e")],
                    revision: None,
                    created_at: chrono::Utc::now(),
                })
                .collect())
        }
        fn suggest_revision(&self, _finding: &PlanFinding, _context: &PlanRuleContext) -> Option<crate::model::Revision> {
            None
        }
    }

    fn ctx() -> PlanRuleContext {
        PlanRuleContext::new(ImplementationPlan::default(), ".")
    }

    #[tokio::test]
    async fn category_toggle_skips_rule() {
        let registry = PlanRuleRegistry::builder()
            .register(Box::new(FixedFindingsRule {
                id: "PLAN.A",
                category: "coverage",
                fast: true,
                count: 1,
            }))
            .build()
            .unwrap();
        let mut config = PlanGuardrailConfig::default();
        config.disabled_categories.insert("coverage".to_string());
        let engine = PlanGuardrailEngine::new(registry, config);
        let result = engine.run(&ctx()).await;
        assert!(result.findings.is_empty());
        assert_eq!(result.rules_skipped, 1);
    }

    #[tokio::test]
    async fn fast_path_excludes_non_fast_rules() {
        let registry = PlanRuleRegistry::builder()
            .register(Box::new(FixedFindingsRule {
                id: "PLAN.SLOW",
                category: "consistency",
                fast: false,
                count: 1,
            }))
            .build()
            .unwrap();
        let engine = PlanGuardrailEngine::new(registry, PlanGuardrailConfig::default());
        let result = engine.run_fast(&ctx()).await;
        assert!(result.findings.is_empty());
        assert_eq!(result.rules_skipped, 1);
    }

    #[tokio::test]
    async fn parallel_mode_matches_sequential_up_to_ordering() {
        let build = || {
            PlanRuleRegistry::builder()
                .register(Box::new(FixedFindingsRule {
                    id: "PLAN.A",
                    category: "coverage",
                    fast: true,
                    count: 3,
                }))
                .register(Box::new(FixedFindingsRule {
                    id: "PLAN.B",
                    category: "architecture",
                    fast: true,
                    count: 2,
                }))
                .build()
                .unwrap()
        };

        let sequential = PlanGuardrailEngine::new(build(), PlanGuardrailConfig::default());
        let mut parallel_config = PlanGuardrailConfig::default();
        parallel_config.parallel = true;
        let parallel = PlanGuardrailEngine::new(build(), parallel_config);

        let mut seq_result = sequential.run(&ctx()).await.findings;
        let mut par_result = parallel.run(&ctx()).await.findings;
        seq_result.sort_by(|a, b| a.summary.cmp(&b.summary).then(a.rule_id.cmp(&b.rule_id)));
        par_result.sort_by(|a, b| a.summary.cmp(&b.summary).then(a.rule_id.cmp(&b.rule_id)));
        assert_eq!(seq_result.len(), 5);
        assert_eq!(seq_result, par_result);
    }

    #[test]
    fn config_rejects_zero_workers() {
        let mut config = PlanGuardrailConfig::default();
        config.worker_count = 0;
        assert!(config.validated().is_err());
    }
}

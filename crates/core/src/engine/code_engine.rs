use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{CodeFinding, Severity, Trigger};
use crate::rule::registry::CodeRuleRegistry;
use crate::rule::CodeRuleContext;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be in {min}..={max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Engine-level knobs (§3 "per-rule cap", §4.2 "soft time budget"). Plain, `serde`-deriving,
/// field-tolerant like `nyzhi-config::Config`'s sub-structs -- not wired to any file/env loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEngineConfig {
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    #[serde(default = "default_max_findings_per_rule")]
    pub max_findings_per_rule: usize,
    #[serde(default = "default_soft_budget_ms")]
    pub soft_time_budget_ms: u64,
    #[serde(default)]
    pub disabled_categories: HashSet<String>,
    #[serde(default)]
    pub severity_overrides: HashMap<String, Severity>,
}

fn default_min_confidence() -> f64 {
    0.5
}

fn default_max_findings_per_rule() -> usize {
    20
}

fn default_soft_budget_ms() -> u64 {
    200
}

impl Default for RuleEngineConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            max_findings_per_rule: default_max_findings_per_rule(),
            soft_time_budget_ms: default_soft_budget_ms(),
            disabled_categories: HashSet::new(),
            severity_overrides: HashMap::new(),
        }
    }
}

impl RuleEngineConfig {
    /// Violations fail construction rather than silently clamping (§7).
    pub fn validated(self) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ConfigError::OutOfRange {
                field: "min_confidence",
                value: self.min_confidence,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(self)
    }
}

/// Aggregated findings, execution counts, timing and per-rule errors from one engine run.
#[derive(Debug, Clone)]
pub struct EngineResult {
    pub findings: Vec<CodeFinding>,
    pub rules_executed: usize,
    pub rules_skipped: usize,
    pub elapsed: Duration,
    pub errors: Vec<(String, String)>,
}

impl EngineResult {
    pub fn should_warn(&self) -> bool {
        !self.findings.is_empty()
    }

    fn file_not_found(path: &str, total_rules: usize) -> Self {
        Self {
            findings: vec![CodeFinding {
                rule_id: "ENGINE.FILE_NOT_FOUND".to_string(),
                severity: Severity::Medium,
                summary: format!("file not found: {path}"),
                file_path: path.to_string(),
                line_start: None,
                line_end: None,
                evidence: vec![],
                confidence: 1.0,
                remediation: vec![],
                fix: None,
            }],
            rules_executed: 0,
            rules_skipped: total_rules,
            elapsed: Duration::default(),
            errors: vec![],
        }
    }
}

/// Trigger-driven evaluator running code-quality rules against a source file (§4.2).
pub struct CodeRuleEngine {
    registry: CodeRuleRegistry,
    config: RuleEngineConfig,
}

impl CodeRuleEngine {
    pub fn new(registry: CodeRuleRegistry, config: RuleEngineConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &CodeRuleRegistry {
        &self.registry
    }

    /// Execute every rule whose trigger set contains `trigger`, whose language filter admits
    /// the context, and whose category is enabled.
    pub fn run(&self, context: &CodeRuleContext, trigger: Trigger) -> EngineResult {
        self.run_filtered(context, trigger, false)
    }

    /// Shortcut for `(trigger=on-write, is_fast=true)`, for post-write latency budgets.
    pub fn run_fast(&self, context: &CodeRuleContext) -> EngineResult {
        self.run_filtered(context, Trigger::OnWrite, true)
    }

    /// Convenience entry point that reads the file itself; on I/O failure returns a single
    /// synthetic finding rather than propagating the error (§7).
    pub async fn run_on_file(&self, path: &str, trigger: Trigger) -> EngineResult {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => self.run(&CodeRuleContext::new(path, content), trigger),
            Err(e) => {
                tracing::warn!(file = path, error = %e, "code rule engine: file unreadable");
                EngineResult::file_not_found(path, self.registry.len())
            }
        }
    }

    fn run_filtered(&self, context: &CodeRuleContext, trigger: Trigger, fast_only: bool) -> EngineResult {
        let started = Instant::now();
        let mut findings = Vec::new();
        let mut errors = Vec::new();
        let mut executed = 0usize;
        let mut skipped = 0usize;

        for rule in self.registry.rules() {
            if !rule.runs_on(trigger)
                || !rule.supports_language(context.language)
                || (fast_only && !rule.is_fast())
                || self.config.disabled_categories.contains(rule.category())
            {
                skipped += 1;
                continue;
            }

            let rule_started = Instant::now();
            let outcome = rule.check(context);
            let rule_elapsed = rule_started.elapsed();
            if rule_elapsed.as_millis() as u64 > self.config.soft_time_budget_ms {
                tracing::warn!(
                    rule_id = rule.rule_id(),
                    elapsed_ms = rule_elapsed.as_millis() as u64,
                    budget_ms = self.config.soft_time_budget_ms,
                    "code rule exceeded soft time budget"
                );
            }

            match outcome {
                Ok(mut rule_findings) => {
                    executed += 1;
                    tracing::debug!(
                        rule_id = rule.rule_id(),
                        elapsed_ms = rule_elapsed.as_millis() as u64,
                        finding_count = rule_findings.len(),
                        "code rule executed"
                    );
                    for f in rule_findings.iter_mut() {
                        if let Some(&sev) = self.config.severity_overrides.get(rule.rule_id()) {
                            f.severity = sev;
                        }
                    }
                    let filtered: Vec<CodeFinding> = rule_findings
                        .into_iter()
                        .filter(|f| f.confidence >= self.config.min_confidence)
                        .take(self.config.max_findings_per_rule)
                        .collect();
                    findings.extend(filtered);
                }
                Err(e) => {
                    executed += 1;
                    tracing::warn!(rule_id = rule.rule_id(), error = %e, "code rule failed");
                    errors.push((rule.rule_id().to_string(), e.to_string()));
                }
            }
        }

        EngineResult {
            findings,
            rules_executed: executed,
            rules_skipped: skipped,
            elapsed: started.elapsed(),
            errors,
        }
    }
}

//! §4.9 `PLAN.PERFORMANCE_PATTERN`: flags tasks whose text matches a catalogue of known
//! performance anti-patterns (N+1 queries, missing cache, blocking calls, unbounded data,
//! memory-intensive operations, needlessly complex algorithms).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{Evidence, PlanFinding, Revision, Severity};
use crate::rule::{PlanRule, PlanRuleContext};

struct AntiPattern {
    name: &'static str,
    confidence: f64,
    patterns: &'static [&'static str],
}

static ANTI_PATTERNS: Lazy<Vec<(AntiPattern, Vec<Regex>)>> = Lazy::new(|| {
    let catalogue: &[AntiPattern] = &[
        AntiPattern {
            name: "N+1 query",
            confidence: 0.75,
            patterns: &[r"(?i)\bfor each\b.*\bquery\b", r"(?i)\bloop\b.*\b(query|fetch)\b", r"(?i)\bn\+1\b"],
        },
        AntiPattern {
            name: "missing cache",
            confidence: 0.6,
            patterns: &[r"(?i)\brepeated(ly)?\b.*\b(fetch|compute|call)\b", r"(?i)\bno caching\b"],
        },
        AntiPattern {
            name: "blocking operation",
            confidence: 0.65,
            patterns: &[r"(?i)\bsynchronous(ly)?\b.*\b(http|network|io|request)\b", r"(?i)\bblocking call\b"],
        },
        AntiPattern {
            name: "unbounded data",
            confidence: 0.7,
            patterns: &[r"(?i)\bload all\b", r"(?i)\bentire (table|dataset|file)\b", r"(?i)\bno pagination\b"],
        },
        AntiPattern {
            name: "memory-intensive",
            confidence: 0.6,
            patterns: &[r"(?i)\bin[- ]memory\b.*\b(all|entire)\b", r"(?i)\blarge (buffer|payload)\b"],
        },
        AntiPattern {
            name: "complex algorithm",
            confidence: 0.55,
            patterns: &[r"(?i)\bnested loop", r"(?i)\bo\(n\^?2\)", r"(?i)\bquadratic\b"],
        },
    ];
    catalogue
        .iter()
        .map(|ap| {
            let compiled = ap.patterns.iter().map(|p| Regex::new(p).unwrap()).collect();
            (
                AntiPattern {
                    name: ap.name,
                    confidence: ap.confidence,
                    patterns: ap.patterns,
                },
                compiled,
            )
        })
        .collect()
});

fn detect_anti_patterns(text: &str) -> Vec<(&'static str, f64)> {
    ANTI_PATTERNS
        .iter()
        .filter(|(_, regexes)| regexes.iter().any(|r| r.is_match(text)))
        .map(|(ap, _)| (ap.name, ap.confidence))
        .collect()
}

pub struct PerformancePatternRule;

impl PlanRule for PerformancePatternRule {
    fn rule_id(&self) -> &'static str {
        "PLAN.PERFORMANCE_PATTERN"
    }
    fn name(&self) -> &'static str {
        "Performance anti-pattern"
    }
    fn category(&self) -> &'static str {
        "performance"
    }
    fn default_severity(&self) -> Severity {
        Severity::Medium
    }
    fn description(&self) -> &'static str {
        "Flags task text matching a catalogue of known performance anti-patterns"
    }

    fn validate(&self, context: &PlanRuleContext) -> anyhow::Result<Vec<PlanFinding>> {
        let mut findings = Vec::new();
        for task in context.plan.all_tasks() {
            let text = task.searchable_text();
            // One finding per anti-pattern per task, not per individual regex match.
            for (name, confidence) in detect_anti_patterns(&text) {
                findings.push(self.build_finding(
                    format!("Task `{}` may exhibit a {name} anti-pattern", task.title),
                    vec![task.id.clone()],
                    confidence,
                    format!("Review `{}` for the {name} pattern before implementing", task.title),
                    vec![Evidence::new(format!("matched {name} pattern")).with_data("task_id", task.id.clone())],
                    None,
                    Some(Self::performance_note_revision(&task.id, name)),
                ));
            }
        }
        Ok(findings)
    }

    fn suggest_revision(&self, finding: &PlanFinding, _context: &PlanRuleContext) -> Option<Revision> {
        let task_id = finding.task_ids.first()?;
        let name = finding.summary.rsplit("a ").next().unwrap_or("performance").trim_end_matches(" anti-pattern");
        Some(Self::performance_note_revision(task_id, name))
    }
}

impl PerformancePatternRule {
    fn performance_note_revision(task_id: &str, anti_pattern: &str) -> Revision {
        let mut fields = std::collections::HashMap::new();
        fields.insert(
            "description_append".to_string(),
            serde_json::json!(format!("\n\nPerformance note: watch for {anti_pattern} during implementation.")),
        );
        fields.insert(
            "acceptance_criteria_append".to_string(),
            serde_json::json!([format!("Verified no {anti_pattern} regression")]),
        );
        Revision::modify_task(format!("possible {anti_pattern} anti-pattern detected"), task_id, fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{ImplementationPlan, Task, TaskGroup};

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
    fn n_plus_one_phrasing_is_flagged() {
        let plan = plan_with_task(Task::new("T1", "For each order, query the customer table"));
        let ctx = PlanRuleContext::new(plan, ".");
        let findings = PerformancePatternRule.validate(&ctx).unwrap();
        assert!(findings.iter().any(|f| f.summary.contains("N+1 query")));
    }

    #[test]
    fn unrelated_task_is_not_flagged() {
        let plan = plan_with_task(Task::new("T1", "Add a CONTRIBUTING.md"));
        let ctx = PlanRuleContext::new(plan, ".");
        let findings = PerformancePatternRule.validate(&ctx).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn multiple_matches_of_same_pattern_produce_one_finding() {
        let plan = plan_with_task(Task::new(
            "T1",
            "Load all rows then loop query each row, entire table scan",
        ));
        let ctx = PlanRuleContext::new(plan, ".");
        let findings = PerformancePatternRule.validate(&ctx).unwrap();
        let n_plus_one_count = findings.iter().filter(|f| f.summary.contains("N+1 query")).count();
        assert_eq!(n_plus_one_count, 1);
    }
}

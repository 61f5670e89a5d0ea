use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::evidence::Evidence;
use super::fix::Fix;
use super::revision::Revision;
use super::severity::Severity;

/// A diagnosed issue produced by a [`crate::rule::CodeRule`] against a source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeFinding {
    pub rule_id: String,
    pub severity: Severity,
    pub summary: String,
    pub file_path: String,
    #[serde(default)]
    pub line_start: Option<usize>,
    #[serde(default)]
    pub line_end: Option<usize>,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    pub confidence: f64,
    #[serde(default)]
    pub remediation: Vec<String>,
    #[serde(default)]
    pub fix: Option<Fix>,
}

impl CodeFinding {
    pub fn line_range(&self) -> Option<(usize, usize)> {
        match (self.line_start, self.line_end) {
            (Some(s), Some(e)) => Some((s, e)),
            (Some(s), None) => Some((s, s)),
            _ => None,
        }
    }
}

/// A diagnosed issue produced by a [`crate::rule::PlanRule`] against a structured plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanFinding {
    pub rule_id: String,
    pub severity: Severity,
    pub summary: String,
    #[serde(default)]
    pub task_ids: Vec<String>,
    #[serde(default)]
    pub suggestion: String,
    #[serde(default)]
    pub auto_revisable: bool,
    pub confidence: f64,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    #[serde(default)]
    pub revision: Option<Revision>,
    pub created_at: DateTime<Utc>,
}

impl PlanFinding {
    pub fn can_auto_revise(&self) -> bool {
        self.auto_revisable && self.revision.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_code_finding() -> CodeFinding {
        CodeFinding {
            rule_id: "RESILIENCE.SWALLOWED_EXCEPTIONS".to_string(),
            severity: Severity::High,
            summary: "Swallowed exception".to_string(),
            file_path: "src/app.py".to_string(),
            line_start: Some(3),
            line_end: Some(4),
            evidence: vec![Evidence::new("empty except body")],
            confidence: 0.92,
            remediation: vec!["Log the exception".to_string()],
            fix: None,
        }
    }

    #[test]
    fn round_trips_through_json() {
        let finding = sample_code_finding();
        let json = serde_json::to_string(&finding).unwrap();
        let back: CodeFinding = serde_json::from_str(&json).unwrap();
        assert_eq!(finding, back);
    }

    #[test]
    fn line_range_falls_back_to_single_line() {
        let mut f = sample_code_finding();
        f.line_end = None;
        assert_eq!(f.line_range(), Some((3, 3)));
    }

    #[test]
    fn plan_finding_requires_both_flag_and_revision() {
        let mut f = PlanFinding {
            rule_id: "PLAN.TEST_REQUIREMENT".to_string(),
            severity: Severity::Medium,
            summary: "missing tests".to_string(),
            task_ids: vec!["T1".to_string()],
            suggestion: "add a test task".to_string(),
            auto_revisable: true,
            confidence: 0.8,
            evidence: vec![],
            revision: None,
            created_at: Utc::now(),
        };
        assert!(!f.can_auto_revise());
        f.revision = Some(crate::model::revision::Revision::add_dependency("x", "T1", "T2"));
        assert!(f.can_auto_revise());
    }
}

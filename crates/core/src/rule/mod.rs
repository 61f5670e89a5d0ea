pub mod context;
pub mod fix_apply;
pub mod registry;

pub use context::{CodeRuleContext, DiffHunk, Language, PlanRuleContext};

use crate::model::{CodeFinding, PlanFinding, Revision, Severity, Trigger};

/// Common contract for the code-rule family (§4.1). Object-safe so the registry can hold
/// `Box<dyn CodeRule>`.
pub trait CodeRule: Send + Sync {
    /// Stable identifier of the form `CATEGORY.NAME`, e.g. `RESILIENCE.SWALLOWED_EXCEPTIONS`.
    fn rule_id(&self) -> &'static str;
    fn name(&self) -> &'static str;
    fn category(&self) -> &'static str;
    fn default_severity(&self) -> Severity;
    fn triggers(&self) -> &'static [Trigger];
    /// `None` means "no language restriction".
    fn languages(&self) -> Option<&'static [Language]> {
        None
    }
    /// Synchronous post-write use: fast, no I/O, no memory search.
    fn is_fast(&self) -> bool {
        true
    }
    fn description(&self) -> &'static str;

    fn supports_language(&self, language: Language) -> bool {
        match self.languages() {
            None => true,
            Some(langs) => langs.contains(&language),
        }
    }

    fn runs_on(&self, trigger: Trigger) -> bool {
        self.triggers().contains(&trigger)
    }

    fn check(&self, context: &CodeRuleContext) -> anyhow::Result<Vec<CodeFinding>>;

    /// Stamps the rule id and resolves effective severity (override then default), per §4.2's
    /// "finding construction helper".
    fn build_finding(
        &self,
        context: &CodeRuleContext,
        summary: impl Into<String>,
        line_start: usize,
        line_end: usize,
        confidence: f64,
        remediation: Vec<String>,
        severity_override: Option<Severity>,
        evidence: Vec<crate::model::Evidence>,
        fix: Option<crate::model::Fix>,
    ) -> CodeFinding {
        CodeFinding {
            rule_id: self.rule_id().to_string(),
            severity: severity_override.unwrap_or_else(|| self.default_severity()),
            summary: summary.into(),
            file_path: context.file_path.clone(),
            line_start: Some(line_start),
            line_end: Some(line_end),
            evidence,
            confidence: confidence.clamp(0.0, 1.0),
            remediation,
            fix,
        }
    }
}

/// Common contract for the plan-validation rule family (§4.9).
pub trait PlanRule: Send + Sync {
    fn rule_id(&self) -> &'static str;
    fn name(&self) -> &'static str;
    fn category(&self) -> &'static str;
    fn default_severity(&self) -> Severity;
    fn is_fast(&self) -> bool {
        true
    }
    fn description(&self) -> &'static str;

    fn validate(&self, context: &PlanRuleContext) -> anyhow::Result<Vec<PlanFinding>>;

    /// May produce an auto-revision for a finding this rule itself raised.
    fn suggest_revision(&self, finding: &PlanFinding, context: &PlanRuleContext) -> Option<Revision>;

    fn build_finding(
        &self,
        summary: impl Into<String>,
        task_ids: Vec<String>,
        confidence: f64,
        suggestion: impl Into<String>,
        evidence: Vec<crate::model::Evidence>,
        severity_override: Option<Severity>,
        revision: Option<Revision>,
    ) -> PlanFinding {
        PlanFinding {
            rule_id: self.rule_id().to_string(),
            severity: severity_override.unwrap_or_else(|| self.default_severity()),
            summary: summary.into(),
            task_ids,
            suggestion: suggestion.into(),
            auto_revisable: revision.is_some(),
            confidence: confidence.clamp(0.0, 1.0),
            evidence,
            revision,
            created_at: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Trigger;

    struct StubRule;

    impl CodeRule for StubRule {
        fn rule_id(&self) -> &'static str {
            "STUB.RULE"
        }
        fn name(&self) -> &'static str {
            "Stub"
        }
        fn category(&self) -> &'static str {
            "tech-debt"
        }
        fn default_severity(&self) -> Severity {
            Severity::Low
        }
        fn triggers(&self) -> &'static [Trigger] {
            &[Trigger::OnWrite]
        }
        fn description(&self) -> &'static str {
            "stub"
        }
        fn check(&self, _context: &CodeRuleContext) -> anyhow::Result<Vec<CodeFinding>> {
            Ok(vec![])
        }
    }

    #[test]
    fn build_finding_stamps_rule_id_and_clamps_confidence() {
        let rule = StubRule;
        let ctx = CodeRuleContext::new("app.py", "x\n");
        let finding = rule.build_finding(&ctx, "issue", 1, 1, 1.5, vec![], None, vec![], None);
        assert_eq!(finding.rule_id, "STUB.RULE");
        assert_eq!(finding.confidence, 1.0);
        assert_eq!(finding.severity, Severity::Low);
    }

    #[test]
    fn severity_override_wins_over_default() {
        let rule = StubRule;
        let ctx = CodeRuleContext::new("app.py", "x\n");
        let finding = rule.build_finding(&ctx, "issue", 1, 1, 0.5, vec![], Some(Severity::Critical), vec![], None);
        assert_eq!(finding.severity, Severity::Critical);
    }
}

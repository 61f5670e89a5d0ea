//! §4.3 git rules: `GIT.FORCE_PUSH`, `GIT.HARD_RESET`, `GIT.DESTRUCTIVE_OPS`. Applied only to
//! shell files, matching shell-invoked git commands rather than library calls.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{CodeFinding, Evidence, Severity, Trigger};
use crate::rule::{CodeRule, CodeRuleContext, Language};

static FORCE_PUSH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"git\s+push\s+.*(--force\b|--force-with-lease\b|-f\b)").unwrap());
static MAIN_BRANCH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(main|master)\b").unwrap());
static HARD_RESET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"git\s+reset\s+--hard\b").unwrap());
static DESTRUCTIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"git\s+(clean\s+-[a-z]*f[a-z]*d?|branch\s+-D\b|push\s+.*--delete\b|checkout\s+\.\s*$|filter-branch\b)")
        .unwrap()
});

/// §8 scenario 2: force-pushing `main`/`master` escalates to a critical "DANGER" summary;
/// force-pushing any other branch is still flagged, but at the plain summary.
pub struct ForcePushRule;

impl CodeRule for ForcePushRule {
    fn rule_id(&self) -> &'static str {
        "GIT.FORCE_PUSH"
    }
    fn name(&self) -> &'static str {
        "Force push"
    }
    fn category(&self) -> &'static str {
        "git"
    }
    fn default_severity(&self) -> Severity {
        Severity::Critical
    }
    fn triggers(&self) -> &'static [Trigger] {
        &[Trigger::OnWrite, Trigger::OnCommit]
    }
    fn languages(&self) -> Option<&'static [Language]> {
        Some(&[Language::Bash])
    }
    fn description(&self) -> &'static str {
        "Flags git push --force invocations, escalating when the target is main/master"
    }

    fn check(&self, context: &CodeRuleContext) -> anyhow::Result<Vec<CodeFinding>> {
        let lines = context.lines();
        let mut findings = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            if !context.in_scope(idx + 1) || !FORCE_PUSH_RE.is_match(line) {
                continue;
            }
            let targets_protected_branch = MAIN_BRANCH_RE.is_match(line);
            let summary = if targets_protected_branch {
                "DANGER: Force push to main/master branch"
            } else {
                "Force push command detected"
            };
            findings.push(self.build_finding(
                context,
                summary,
                idx + 1,
                idx + 1,
                0.95,
                vec![
                    "Use --force-with-lease instead of --force to avoid clobbering others' work".to_string(),
                    "Never force-push to a shared branch without team agreement".to_string(),
                ],
                None,
                vec![Evidence::new("force push invocation").with_line(idx + 1).with_snippet(*line)],
                None,
            ));
        }

        Ok(findings)
    }
}

pub struct HardResetRule;

impl CodeRule for HardResetRule {
    fn rule_id(&self) -> &'static str {
        "GIT.HARD_RESET"
    }
    fn name(&self) -> &'static str {
        "Hard reset"
    }
    fn category(&self) -> &'static str {
        "git"
    }
    fn default_severity(&self) -> Severity {
        Severity::Critical
    }
    fn triggers(&self) -> &'static [Trigger] {
        &[Trigger::OnWrite, Trigger::OnCommit]
    }
    fn languages(&self) -> Option<&'static [Language]> {
        Some(&[Language::Bash])
    }
    fn description(&self) -> &'static str {
        "Flags git reset --hard invocations, which discard uncommitted work irrecoverably"
    }

    fn check(&self, context: &CodeRuleContext) -> anyhow::Result<Vec<CodeFinding>> {
        let lines = context.lines();
        let mut findings = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            if !context.in_scope(idx + 1) || !HARD_RESET_RE.is_match(line) {
                continue;
            }
            findings.push(self.build_finding(
                context,
                "git reset --hard discards uncommitted changes irrecoverably",
                idx + 1,
                idx + 1,
                0.9,
                vec![
                    "Stash or commit changes before resetting if they might be needed later".to_string(),
                    "Prefer `git reset --soft` or `--mixed` when history, not working-tree state, needs rewinding".to_string(),
                ],
                None,
                vec![Evidence::new("hard reset invocation").with_line(idx + 1).with_snippet(*line)],
                None,
            ));
        }

        Ok(findings)
    }
}

/// Bucket rule for the remaining destructive invocations (§4.3): `git clean -fd`, force-deleting
/// a branch, deleting a remote branch, discarding all working-tree changes, or rewriting history
/// with `filter-branch`.
pub struct DestructiveOpsRule;

impl CodeRule for DestructiveOpsRule {
    fn rule_id(&self) -> &'static str {
        "GIT.DESTRUCTIVE_OPS"
    }
    fn name(&self) -> &'static str {
        "Destructive git operation"
    }
    fn category(&self) -> &'static str {
        "git"
    }
    fn default_severity(&self) -> Severity {
        Severity::Critical
    }
    fn triggers(&self) -> &'static [Trigger] {
        &[Trigger::OnWrite, Trigger::OnCommit]
    }
    fn languages(&self) -> Option<&'static [Language]> {
        Some(&[Language::Bash])
    }
    fn description(&self) -> &'static str {
        "Flags other irrecoverably destructive git invocations (clean -fd, branch -D, filter-branch, ...)"
    }

    fn check(&self, context: &CodeRuleContext) -> anyhow::Result<Vec<CodeFinding>> {
        let lines = context.lines();
        let mut findings = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            if !context.in_scope(idx + 1) || !DESTRUCTIVE_RE.is_match(line) {
                continue;
            }
            findings.push(self.build_finding(
                context,
                "Destructive git operation detected",
                idx + 1,
                idx + 1,
                0.85,
                vec!["Confirm this command's target before running it; its effects are not reversible".to_string()],
                None,
                vec![Evidence::new("destructive git invocation").with_line(idx + 1).with_snippet(*line)],
                None,
            ));
        }

        Ok(findings)
    }
}

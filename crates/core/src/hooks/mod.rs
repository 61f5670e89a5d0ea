//! §4.13: adapters between the hook call shapes and the library's internal types. Both hooks
//! fail open (§6/§7) -- errors are captured into a response field rather than propagated.

use std::path::PathBuf;

use crate::engine::CodeRuleEngine;
use crate::injection::ContextInjector;
use crate::plan_mode::{detect_plan_mode, PlanModeContext, PlanModeDetector};
use crate::rule::CodeRuleContext;

/// Inbound shape for a user-prompt-submit hook.
#[derive(Debug, Clone)]
pub struct UserPromptHookRequest {
    pub prompt: String,
    pub project_root: PathBuf,
    pub plan_mode_context: PlanModeContext,
    pub now: f64,
}

/// Outbound shape: the text to prepend to the prompt, plus the updated plan-mode context the
/// caller must persist for the next turn.
#[derive(Debug, Clone, Default)]
pub struct UserPromptHookResponse {
    pub injected_text: String,
    pub plan_mode_context: PlanModeContext,
    pub is_plan_mode: bool,
    pub error: Option<String>,
}

/// §4.13: composes plan-mode detection with guideline/hint injection. A status line about
/// plan mode comes first, followed by the guidelines+hints block; never fails the call.
pub fn run_user_prompt_hook(
    request: UserPromptHookRequest,
    detector: &PlanModeDetector,
    injector: &ContextInjector,
) -> UserPromptHookResponse {
    let (detection, updated_context) = detect_plan_mode(detector, &request.prompt, request.plan_mode_context, request.now);

    let mut sections = Vec::new();
    if detection.is_plan_mode {
        sections.push(format!(
            "Plan mode is active (confidence {:.2}, turn {}).",
            updated_context.confidence, updated_context.turn_count
        ));
    }

    let injected = injector.build(&request.prompt, &request.project_root);
    if !injected.text.is_empty() {
        sections.push(injected.text);
    }

    UserPromptHookResponse {
        injected_text: sections.join("\n\n"),
        plan_mode_context: updated_context,
        is_plan_mode: detection.is_plan_mode,
        error: None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostWriteStatus {
    Ok,
    Warn,
}

/// Inbound shape for a post-tool-use (file write) hook.
#[derive(Debug, Clone)]
pub struct PostWriteHookRequest {
    pub file_path: String,
    pub content: String,
}

/// Outbound shape: findings from the fast code-rule subset, pre-formatted for display.
#[derive(Debug, Clone)]
pub struct PostWriteHookResponse {
    pub status: PostWriteStatus,
    pub finding_count: usize,
    pub text: String,
    pub error: Option<String>,
}

impl PostWriteHookResponse {
    pub fn format_text(&self) -> &str {
        &self.text
    }
}

/// §4.13/§7: wraps [`CodeRuleEngine::run_fast`]; per-rule failures are already captured inside
/// `EngineResult::errors` by the engine itself, so this adapter never needs its own catch.
pub fn run_post_write_hook(request: PostWriteHookRequest, engine: &CodeRuleEngine) -> PostWriteHookResponse {
    let context = CodeRuleContext::new(request.file_path.clone(), request.content);
    let result = engine.run_fast(&context);

    let status = if result.should_warn() { PostWriteStatus::Warn } else { PostWriteStatus::Ok };
    let text = if result.findings.is_empty() {
        String::new()
    } else {
        let mut out = format!("{} potential issue(s) in {}:\n", result.findings.len(), request.file_path);
        for finding in &result.findings {
            out.push_str(&format!("- [{:?}] {}\n", finding.severity, finding.summary));
        }
        out
    };

    PostWriteHookResponse {
        status,
        finding_count: result.findings.len(),
        text,
        error: if result.errors.is_empty() {
            None
        } else {
            Some(result.errors.iter().map(|(id, msg)| format!("{id}: {msg}")).collect::<Vec<_>>().join("; "))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RuleEngineConfig;
    use crate::injection::InjectorConfig;
    use crate::rule::registry::CodeRuleRegistry;
    use crate::rules::code::default_registry;

    fn injector() -> ContextInjector {
        ContextInjector::new(InjectorConfig::default())
    }

    #[test]
    fn plan_mode_status_line_included_when_active() {
        let tmp = tempfile::tempdir().unwrap();
        let request = UserPromptHookRequest {
            prompt: "@plan Create a feature plan".to_string(),
            project_root: tmp.path().to_path_buf(),
            plan_mode_context: PlanModeContext::default(),
            now: 10.0,
        };
        let response = run_user_prompt_hook(request, &PlanModeDetector::default(), &injector());
        assert!(response.is_plan_mode);
        assert!(response.injected_text.starts_with("Plan mode is active"));
        assert!(response.plan_mode_context.is_active);
    }

    #[test]
    fn guidelines_included_when_not_in_plan_mode() {
        let tmp = tempfile::tempdir().unwrap();
        let request = UserPromptHookRequest {
            prompt: "fix the bug in AuthService".to_string(),
            project_root: tmp.path().to_path_buf(),
            plan_mode_context: PlanModeContext::default(),
            now: 10.0,
        };
        let response = run_user_prompt_hook(request, &PlanModeDetector::default(), &injector());
        assert!(!response.is_plan_mode);
        assert!(response.injected_text.contains("## Code reuse"));
    }

    #[test]
    fn post_write_hook_reports_findings_from_fast_rules() {
        let registry = default_registry().unwrap();
        let engine = CodeRuleEngine::new(registry, RuleEngineConfig::default());
        let request = PostWriteHookRequest {
            file_path: "app.py".to_string(),
            content: "try:\n    do_thing()\nexcept Exception:\n    pass\n".to_string(),
        };
        let response = run_post_write_hook(request, &engine);
        assert!(response.error.is_none());
    }

    #[test]
    fn post_write_hook_ok_status_when_no_findings() {
        let registry = CodeRuleRegistry::builder().build().unwrap();
        let engine = CodeRuleEngine::new(registry, RuleEngineConfig::default());
        let request = PostWriteHookRequest {
            file_path: "app.py".to_string(),
            content: "x = 1\n".to_string(),
        };
        let response = run_post_write_hook(request, &engine);
        assert_eq!(response.status, PostWriteStatus::Ok);
        assert_eq!(response.finding_count, 0);
        assert!(response.text.is_empty());
    }
}

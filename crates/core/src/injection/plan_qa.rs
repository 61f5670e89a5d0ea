//! §4.7 plan-QA verifier: pattern-based checks against free-form generated plan text.

use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

static NEEDS_TESTS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(implement|add|create|build|develop|introduce|write)\b.*\b(feature|function|method|endpoint|class|module)\b").unwrap());
static HAS_TEST_TASKS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\btest(s|ing)?\b").unwrap());
static IS_USER_FACING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(api|user|interface|config|cli|route|ui|frontend|endpoint)\b").unwrap());
static HAS_DOC_TASKS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(docs?|documentation|readme)\b").unwrap());
static CREATES_NEW_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(create|add|implement|build)\b.*\b(class|function|service|component|module)\b").unwrap());
static MENTIONS_REUSE_CHECK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(search|check|look)\w*\s+(for\s+)?(existing|duplicate|similar|reuse)").unwrap());

struct AntiPattern {
    label: &'static str,
    regex: Regex,
}

static ANTI_PATTERNS: Lazy<Vec<AntiPattern>> = Lazy::new(|| {
    vec![
        AntiPattern {
            label: "O(n^2) complexity",
            regex: Regex::new(r"(?i)o\(n\^?2\)|o\(n\s*\*\s*n\)").unwrap(),
        },
        AntiPattern {
            label: "nested loop",
            regex: Regex::new(r"(?i)nested loop").unwrap(),
        },
        AntiPattern {
            label: "missing timeout",
            regex: Regex::new(r"(?i)no timeout|without (a )?timeout").unwrap(),
        },
        AntiPattern {
            label: "synchronous HTTP call",
            regex: Regex::new(r"(?i)synchronous http|blocking http").unwrap(),
        },
        AntiPattern {
            label: "unbounded memory growth",
            regex: Regex::new(r"(?i)unbounded memory|load (the )?entire|load everything into memory").unwrap(),
        },
        AntiPattern {
            label: "N+1 query",
            regex: Regex::new(r"(?i)n\s*\+\s*1 quer").unwrap(),
        },
        AntiPattern {
            label: "global mutable state",
            regex: Regex::new(r"(?i)global (mutable )?state|global variable").unwrap(),
        },
        AntiPattern {
            label: "circular dependency",
            regex: Regex::new(r"(?i)circular depend").unwrap(),
        },
    ]
});

fn default_true() -> bool {
    true
}

/// Per-check toggle and fail-hard configuration (§4.7, §9's "never itself gates anything").
#[derive(Debug, Clone)]
pub struct PlanQAConfig {
    pub enabled: bool,
    pub check_tests: bool,
    pub check_docs: bool,
    pub check_duplicates: bool,
    pub check_architecture: bool,
    pub fail_on_missing_tests: bool,
    pub fail_on_missing_docs: bool,
    pub fail_on_duplicates: bool,
    pub fail_on_architecture_warnings: bool,
}

impl Default for PlanQAConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            check_tests: default_true(),
            check_docs: default_true(),
            check_duplicates: default_true(),
            check_architecture: default_true(),
            fail_on_missing_tests: false,
            fail_on_missing_docs: false,
            fail_on_duplicates: false,
            fail_on_architecture_warnings: false,
        }
    }
}

/// Aggregate output of one [`PlanQAVerifier::verify_plan`] call.
#[derive(Debug, Clone, Default)]
pub struct PlanQAResult {
    pub missing_tests: Vec<String>,
    pub missing_docs: Vec<String>,
    pub potential_duplicates: Vec<String>,
    pub architecture_warnings: Vec<String>,
    pub suggestions: Vec<String>,
    pub is_valid: bool,
    pub elapsed: Duration,
}

impl PlanQAResult {
    /// True when any issue category is non-empty; `suggestions` alone never count (§4.7).
    pub fn has_issues(&self) -> bool {
        !self.missing_tests.is_empty()
            || !self.missing_docs.is_empty()
            || !self.potential_duplicates.is_empty()
            || !self.architecture_warnings.is_empty()
    }

    pub fn to_human_feedback(&self) -> String {
        if !self.has_issues() {
            return "Plan QA: no issues found.".to_string();
        }
        let mut out = String::from("Plan QA found potential issues:\n");
        for suggestion in &self.suggestions {
            out.push_str("- ");
            out.push_str(suggestion);
            out.push('\n');
        }
        out
    }

    pub fn to_machine_dict(&self) -> serde_json::Value {
        json!({
            "missing_tests": self.missing_tests,
            "missing_docs": self.missing_docs,
            "potential_duplicates": self.potential_duplicates,
            "architecture_warnings": self.architecture_warnings,
            "suggestions": self.suggestions,
            "is_valid": self.is_valid,
            "elapsed_ms": self.elapsed.as_millis() as u64,
        })
    }
}

/// §4.7: verifies free-form plan text with pattern-based checks. `is_valid` is warn-only
/// unless the corresponding `fail_on_*` flag is set (§9 design note: "never itself blocks
/// anything").
#[derive(Debug, Clone, Default)]
pub struct PlanQAVerifier {
    pub config: PlanQAConfig,
}

impl PlanQAVerifier {
    pub fn new(config: PlanQAConfig) -> Self {
        Self { config }
    }

    pub fn verify_plan(&self, text: &str) -> PlanQAResult {
        let started = Instant::now();
        if !self.config.enabled {
            return PlanQAResult {
                is_valid: true,
                elapsed: started.elapsed(),
                ..Default::default()
            };
        }

        let needs_tests = NEEDS_TESTS_RE.is_match(text);
        let has_test_tasks = HAS_TEST_TASKS_RE.is_match(text);
        let is_user_facing = IS_USER_FACING_RE.is_match(text);
        let has_doc_tasks = HAS_DOC_TASKS_RE.is_match(text);
        let creates_new_code = CREATES_NEW_CODE_RE.is_match(text);
        let mentions_reuse_check = MENTIONS_REUSE_CHECK_RE.is_match(text);

        let mut missing_tests = Vec::new();
        let mut missing_docs = Vec::new();
        let mut potential_duplicates = Vec::new();
        let mut architecture_warnings = Vec::new();
        let mut suggestions = Vec::new();

        if self.config.check_tests && needs_tests && !has_test_tasks {
            missing_tests.push("plan introduces new behaviour with no associated test task".to_string());
            suggestions.push("Add a task covering tests for the new behaviour.".to_string());
        }
        if self.config.check_docs && is_user_facing && !has_doc_tasks {
            missing_docs.push("plan touches user-facing surface with no associated documentation task".to_string());
            suggestions.push("Add a task covering documentation for the user-facing change.".to_string());
        }
        if self.config.check_duplicates && creates_new_code && !mentions_reuse_check {
            potential_duplicates.push("plan creates new code with no mention of a reuse/duplicate check".to_string());
            suggestions.push("Search for existing implementations before creating new code.".to_string());
        }
        if self.config.check_architecture {
            for pattern in ANTI_PATTERNS.iter() {
                if pattern.regex.is_match(text) {
                    architecture_warnings.push(format!("potential anti-pattern: {}", pattern.label));
                    if architecture_warnings.len() >= 3 {
                        break;
                    }
                }
            }
            if !architecture_warnings.is_empty() {
                suggestions.push("Review the plan for the flagged architectural anti-patterns.".to_string());
            }
        }

        let mut is_valid = true;
        if self.config.fail_on_missing_tests && !missing_tests.is_empty() {
            is_valid = false;
        }
        if self.config.fail_on_missing_docs && !missing_docs.is_empty() {
            is_valid = false;
        }
        if self.config.fail_on_duplicates && !potential_duplicates.is_empty() {
            is_valid = false;
        }
        if self.config.fail_on_architecture_warnings && !architecture_warnings.is_empty() {
            is_valid = false;
        }

        PlanQAResult {
            missing_tests,
            missing_docs,
            potential_duplicates,
            architecture_warnings,
            suggestions,
            is_valid,
            elapsed: started.elapsed(),
        }
    }
}

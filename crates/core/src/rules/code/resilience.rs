//! §4.3 resilience rules: `RESILIENCE.SWALLOWED_EXCEPTIONS` and `RESILIENCE.MISSING_RETRY`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{CodeFinding, Evidence, Severity, Trigger};
use crate::rule::{CodeRule, CodeRuleContext, Language};

use super::lang::{brace_block, indentation_of, is_comment_line, is_test_file, offside_block};

static PY_EXCEPT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*except\b").unwrap());
static JS_CATCH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bcatch\s*\(").unwrap());
static JS_PROMISE_CATCH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.catch\s*\(\s*(\([^)]*\)|\w+)\s*=>\s*\{?\s*\}?\s*\)").unwrap());

/// Presence of any of these in a handler body means the exception was not actually swallowed.
static SUPPRESSION_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\b(log|logger|logging)\.\w*(error|exception|warn|critical)",
        r"\b(sentry|bugsnag|rollbar)\b",
        r"\braise\b",
        r"\brethrow\b",
        r"\bthrow\b",
        r"\berror\s*=",
        r"\bstatus\s*=",
        r"\breturn\b",
        r"(?i)\b(intentional|ignore|ignored|expected|noop|no-op)\b",
        r"\b(close|dispose|release|cleanup)\s*\(",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

fn body_is_suppressed(lines: &[&str], start: usize, end: usize, language: Language) -> bool {
    for line in &lines[start..end] {
        if line.trim().is_empty() || is_comment_line(line, language) {
            continue;
        }
        if SUPPRESSION_RES.iter().any(|re| re.is_match(line)) {
            return true;
        }
    }
    false
}

/// Detects `except`/`catch` blocks whose body does nothing to observe or propagate the error
/// (§8 scenario 1: bare `except Exception: pass` fires; a body that logs, re-raises, sets an
/// error flag, returns, or is explicitly marked intentional does not).
pub struct SwallowedExceptionsRule;

impl CodeRule for SwallowedExceptionsRule {
    fn rule_id(&self) -> &'static str {
        "RESILIENCE.SWALLOWED_EXCEPTIONS"
    }
    fn name(&self) -> &'static str {
        "Swallowed exceptions"
    }
    fn category(&self) -> &'static str {
        "resilience"
    }
    fn default_severity(&self) -> Severity {
        Severity::High
    }
    fn triggers(&self) -> &'static [Trigger] {
        &[Trigger::OnWrite, Trigger::OnStop]
    }
    fn description(&self) -> &'static str {
        "Flags except/catch blocks that swallow an error without logging, re-raising, or otherwise handling it"
    }

    fn check(&self, context: &CodeRuleContext) -> anyhow::Result<Vec<CodeFinding>> {
        let lines: Vec<&str> = context.lines();
        let mut findings = Vec::new();
        let in_test = is_test_file(&context.file_path);

        for (idx, line) in lines.iter().enumerate() {
            if !context.in_scope(idx + 1) {
                continue;
            }
            let (body_start, body_end) = match context.language {
                Language::Python if PY_EXCEPT_RE.is_match(line) => {
                    offside_block(&lines, idx, indentation_of(line))
                }
                Language::JavaScript | Language::TypeScript if JS_CATCH_RE.is_match(line) => {
                    // The header line may carry a stray closing brace from the preceding `try`
                    // block (`} catch (e) {`); scan only from the `catch` keyword onward so that
                    // brace doesn't get counted as part of this block.
                    let catch_at = JS_CATCH_RE.find(line).unwrap().start();
                    let mut scan_lines = lines.clone();
                    scan_lines[idx] = &(*line)[catch_at..];
                    match brace_block(&scan_lines, idx, 2) {
                        Some(range) => range,
                        None => continue,
                    }
                }
                Language::JavaScript | Language::TypeScript if JS_PROMISE_CATCH_RE.is_match(line) => {
                    let mut confidence: f64 = 0.85;
                    if in_test {
                        confidence -= 0.2;
                    }
                    findings.push(self.build_finding(
                        context,
                        "Promise rejection silently discarded by an empty .catch() handler",
                        idx + 1,
                        idx + 1,
                        confidence,
                        vec![
                            "Log the exception (or rejection reason) before continuing".to_string(),
                            "Re-throw if the caller needs to react to the failure".to_string(),
                        ],
                        None,
                        vec![Evidence::new("empty .catch() handler").with_line(idx + 1).with_snippet(*line)],
                        None,
                    ));
                    continue;
                }
                _ => continue,
            };

            if body_is_suppressed(&lines, body_start, body_end.min(lines.len()), context.language) {
                continue;
            }

            let mut confidence: f64 = 0.92;
            if in_test {
                confidence -= 0.25;
            }
            findings.push(self.build_finding(
                context,
                "Exception handler does not log, re-raise, or otherwise observe the error",
                idx + 1,
                idx + 1,
                confidence,
                vec![
                    "Log the exception with enough context to debug it".to_string(),
                    "Re-raise if the caller needs to know the operation failed".to_string(),
                    "If swallowing is intentional, add a comment explaining why".to_string(),
                ],
                None,
                vec![Evidence::new("exception handler body").with_line(body_start + 1)],
                None,
            ));
        }

        Ok(findings)
    }
}

static RETRYABLE_CALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(requests?\.(get|post|put|patch|delete)|fetch|axios|httpx?\.(get|post|put|patch|delete)|\.query\(|\.execute\(|connect\()").unwrap()
});
static RETRY_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(retry|retries|backoff|tenacity|max_attempts|circuit.?breaker)\b").unwrap());
/// Explicit attempt loop, e.g. `for attempt in range(3):` / `while attempt < max_attempts:`.
static ATTEMPT_LOOP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(for|while)\b.*\battempts?\b").unwrap());
/// `time.sleep(...)` / `sleep(...)` / `setTimeout(...)`, the other half of a manual retry loop.
static SLEEP_CALL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(sleep|set_?timeout)\s*\(").unwrap());
/// A `def`/`function`/`const` header whose name contains "retry" -- the call site is inside a
/// function that is itself the retry wrapper.
static RETRY_FN_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(def|function|const|let|var|fn)\s+\w*retry\w*").unwrap());

const NEARBY_WINDOW: usize = 20;

/// §4.3's "surrounding ±N lines" suppression check, ported from
/// `_has_retry_nearby`/`_is_in_retry_wrapper`/the function-name dampener in
/// `examples/original_source/claude_indexer/rules/resilience/missing_retry.py`: a retry/backoff
/// keyword nearby, an explicit attempt loop with a sleep call nearby, or an enclosing function
/// whose name contains "retry" all suppress the finding.
fn has_nearby_retry_indicator(lines: &[&str], idx: usize) -> bool {
    let start = idx.saturating_sub(NEARBY_WINDOW);
    let end = (idx + NEARBY_WINDOW + 1).min(lines.len());
    let window = lines[start..end].join("\n");

    if RETRY_MARKER_RE.is_match(&window) {
        return true;
    }
    if ATTEMPT_LOOP_RE.is_match(&window) && SLEEP_CALL_RE.is_match(&window) {
        return true;
    }

    let fn_start = idx.saturating_sub(NEARBY_WINDOW);
    let fn_window = lines[fn_start..=idx].join("\n");
    RETRY_FN_NAME_RE.is_match(&fn_window)
}

/// Flags network/database calls with no retry or backoff anywhere nearby, a much weaker and
/// lower-confidence signal than swallowed exceptions since most call sites are intentionally
/// best-effort (§4.3).
pub struct MissingRetryRule;

impl CodeRule for MissingRetryRule {
    fn rule_id(&self) -> &'static str {
        "RESILIENCE.MISSING_RETRY"
    }
    fn name(&self) -> &'static str {
        "Missing retry/backoff"
    }
    fn category(&self) -> &'static str {
        "resilience"
    }
    fn default_severity(&self) -> Severity {
        Severity::Medium
    }
    fn triggers(&self) -> &'static [Trigger] {
        &[Trigger::OnWrite, Trigger::OnStop]
    }
    fn is_fast(&self) -> bool {
        true
    }
    fn description(&self) -> &'static str {
        "Flags network or database calls with no retry, backoff, or circuit breaker anywhere in the file"
    }

    fn check(&self, context: &CodeRuleContext) -> anyhow::Result<Vec<CodeFinding>> {
        // File-level retry import/decorator (e.g. `from tenacity import retry`, `@backoff...`)
        // suppresses the whole file, matching `_has_file_level_retry` in the original rule.
        if RETRY_MARKER_RE.is_match(&context.content) {
            return Ok(vec![]);
        }

        let lines = context.lines();
        let mut findings = Vec::new();
        let in_test = is_test_file(&context.file_path);

        for (idx, line) in lines.iter().enumerate() {
            if !context.in_scope(idx + 1) || is_comment_line(line, context.language) {
                continue;
            }
            if let Some(m) = RETRYABLE_CALL_RE.find(line) {
                if has_nearby_retry_indicator(&lines, idx) {
                    continue;
                }
                let mut confidence: f64 = 0.55;
                if in_test {
                    confidence -= 0.3;
                }
                findings.push(self.build_finding(
                    context,
                    format!("Call to `{}` has no retry or backoff in this file", m.as_str()),
                    idx + 1,
                    idx + 1,
                    confidence,
                    vec![
                        "Wrap transient failures in a retry with exponential backoff".to_string(),
                        "Consider a circuit breaker if this call is on a hot path".to_string(),
                    ],
                    None,
                    vec![Evidence::new("network/database call without retry").with_line(idx + 1).with_snippet(*line)],
                    None,
                ));
            }
        }

        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_except_pass_fires_high_confidence_finding() {
        let ctx = CodeRuleContext::new("app.py", "try:\n    do()\nexcept Exception:\n    pass\n");
        let findings = SwallowedExceptionsRule.check(&ctx).unwrap();
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.rule_id, "RESILIENCE.SWALLOWED_EXCEPTIONS");
        assert_eq!(f.severity, Severity::High);
        assert_eq!(f.line_start, Some(3));
        assert!(f.confidence >= 0.90);
        assert!(f.remediation[0].starts_with("Log the exception"));
    }

    #[test]
    fn except_that_logs_is_not_flagged() {
        let ctx = CodeRuleContext::new(
            "app.py",
            "try:\n    do()\nexcept Exception as e:\n    logger.exception(e)\n",
        );
        let findings = SwallowedExceptionsRule.check(&ctx).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn except_that_reraises_is_not_flagged() {
        let ctx = CodeRuleContext::new(
            "app.py",
            "try:\n    do()\nexcept Exception:\n    raise\n",
        );
        let findings = SwallowedExceptionsRule.check(&ctx).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn js_catch_block_with_empty_body_fires() {
        let ctx = CodeRuleContext::new("app.js", "try {\n    doThing();\n} catch (e) {\n}\n");
        let findings = SwallowedExceptionsRule.check(&ctx).unwrap();
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn empty_promise_catch_is_flagged() {
        let ctx = CodeRuleContext::new("app.js", "fetchThing().catch((e) => {});\n");
        let findings = SwallowedExceptionsRule.check(&ctx).unwrap();
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn test_file_confidence_is_dampened() {
        let ctx = CodeRuleContext::new("tests/test_app.py", "try:\n    do()\nexcept Exception:\n    pass\n");
        let findings = SwallowedExceptionsRule.check(&ctx).unwrap();
        assert!(findings[0].confidence < 0.92);
    }

    #[test]
    fn missing_retry_flags_bare_http_call() {
        let ctx = CodeRuleContext::new("client.py", "def get():\n    return requests.get(url)\n");
        let findings = MissingRetryRule.check(&ctx).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "RESILIENCE.MISSING_RETRY");
    }

    #[test]
    fn missing_retry_skips_file_with_retry_marker() {
        let ctx = CodeRuleContext::new(
            "client.py",
            "@retry(max_attempts=3)\ndef get():\n    return requests.get(url)\n",
        );
        let findings = MissingRetryRule.check(&ctx).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn missing_retry_skips_explicit_attempt_loop_with_sleep() {
        let ctx = CodeRuleContext::new(
            "client.py",
            "def get():\n    for attempt in range(3):\n        try:\n            return requests.get(url)\n        except Exception:\n            time.sleep(2 ** attempt)\n",
        );
        let findings = MissingRetryRule.check(&ctx).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn missing_retry_skips_call_inside_retry_named_function() {
        let ctx = CodeRuleContext::new(
            "client.py",
            "def fetch_with_retry():\n    return requests.get(url)\n",
        );
        let findings = MissingRetryRule.check(&ctx).unwrap();
        assert!(findings.is_empty());
    }
}

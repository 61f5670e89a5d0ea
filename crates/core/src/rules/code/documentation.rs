//! §4.3 `DOCUMENTATION.OUTDATED_DOCS`: diffs a function's actual parameters against the
//! parameters documented in its docstring (Python) or preceding block comment (JS/TS).

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{CodeFinding, Evidence, Severity, Trigger};
use crate::rule::{CodeRule, CodeRuleContext, Language};

use super::lang::indentation_of;

static PY_DEF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(?:async\s+)?def\s+(\w+)\s*\(([^)]*)\)").unwrap());
static JS_FN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:export\s+)?(?:async\s+)?function\s+(\w+)\s*\(([^)]*)\)").unwrap()
});
static PY_DOC_PARAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*:param\s+(\w+)|^\s*(\w+)\s*(?:\([^)]*\))?\s*:").unwrap());
static JSDOC_PARAM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"@param\s+\{[^}]*\}\s*(\w+)|@param\s+(\w+)").unwrap());

/// Docstring-section keywords that look like parameter names in a naive scan but are not.
const SECTION_KEYWORDS: &[&str] = &[
    "returns", "return", "raises", "raise", "example", "examples", "yields", "yield", "note",
    "notes", "see", "args", "arguments", "parameters", "params", "attributes", "throws",
];

fn parse_signature_params(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| {
            let name = p.split(':').next().unwrap_or(p).split('=').next().unwrap_or(p).trim();
            name.trim_start_matches('*').trim_start_matches('&').to_string()
        })
        .filter(|n| n != "self" && n != "cls" && !n.is_empty())
        .collect()
}

fn python_docstring_params(lines: &[&str], def_idx: usize) -> Option<BTreeSet<String>> {
    let body_indent = indentation_of(lines.get(def_idx + 1)?);
    let first = lines.get(def_idx + 1)?.trim_start();
    if !(first.starts_with("\"\"\"") || first.starts_with("'''")) {
        return None;
    }
    let quote = &first[..3];
    let mut params = BTreeSet::new();
    let mut idx = def_idx + 1;
    // Skip the opening line itself unless the docstring closes on the same line.
    if first.len() > 3 && first[3..].contains(quote) {
        return Some(params);
    }
    idx += 1;
    while idx < lines.len() {
        let line = lines[idx];
        if line.trim_start().starts_with(quote) {
            break;
        }
        if indentation_of(line) < body_indent && !line.trim().is_empty() {
            break;
        }
        if let Some(caps) = PY_DOC_PARAM_RE.captures(line) {
            let name = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str().to_string());
            if let Some(name) = name {
                if !SECTION_KEYWORDS.contains(&name.to_ascii_lowercase().as_str()) {
                    params.insert(name);
                }
            }
        }
        idx += 1;
    }
    Some(params)
}

fn jsdoc_params(lines: &[&str], fn_idx: usize) -> Option<BTreeSet<String>> {
    let mut idx = fn_idx;
    if idx == 0 {
        return None;
    }
    idx -= 1;
    if !lines[idx].trim_end().ends_with("*/") {
        return None;
    }
    let mut params = BTreeSet::new();
    while idx > 0 {
        let line = lines[idx];
        for caps in JSDOC_PARAM_RE.captures_iter(line) {
            let name = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str().to_string());
            if let Some(name) = name {
                params.insert(name);
            }
        }
        if line.trim_start().starts_with("/**") {
            break;
        }
        idx -= 1;
    }
    Some(params)
}

/// Diffs documented parameters against a function's actual signature (§8 scenario: a renamed or
/// added/removed parameter that the docstring/JSDoc was never updated to match).
pub struct OutdatedDocsRule;

impl CodeRule for OutdatedDocsRule {
    fn rule_id(&self) -> &'static str {
        "DOCUMENTATION.OUTDATED_DOCS"
    }
    fn name(&self) -> &'static str {
        "Outdated documentation"
    }
    fn category(&self) -> &'static str {
        "documentation"
    }
    fn default_severity(&self) -> Severity {
        Severity::Medium
    }
    fn triggers(&self) -> &'static [Trigger] {
        &[Trigger::OnWrite, Trigger::OnStop]
    }
    fn languages(&self) -> Option<&'static [Language]> {
        Some(&[Language::Python, Language::JavaScript, Language::TypeScript])
    }
    fn description(&self) -> &'static str {
        "Flags functions whose documented parameters no longer match the actual signature"
    }

    fn check(&self, context: &CodeRuleContext) -> anyhow::Result<Vec<CodeFinding>> {
        let lines = context.lines();
        let mut findings = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            if !context.in_scope(idx + 1) {
                continue;
            }
            let (name, actual, documented) = match context.language {
                Language::Python => match PY_DEF_RE.captures(line) {
                    Some(caps) => {
                        let name = caps[1].to_string();
                        let actual = parse_signature_params(&caps[2]);
                        let documented = match python_docstring_params(&lines, idx) {
                            Some(p) => p,
                            None => continue,
                        };
                        (name, actual, documented)
                    }
                    None => continue,
                },
                Language::JavaScript | Language::TypeScript => match JS_FN_RE.captures(line) {
                    Some(caps) => {
                        let name = caps[1].to_string();
                        let actual = parse_signature_params(&caps[2]);
                        let documented = match jsdoc_params(&lines, idx) {
                            Some(p) => p,
                            None => continue,
                        };
                        (name, actual, documented)
                    }
                    None => continue,
                },
                _ => continue,
            };

            let missing_from_docs: Vec<&String> = actual.difference(&documented).collect();
            let stale_in_docs: Vec<&String> = documented.difference(&actual).collect();
            if missing_from_docs.is_empty() && stale_in_docs.is_empty() {
                continue;
            }

            let mismatch_count = missing_from_docs.len() + stale_in_docs.len();
            let both_sides_differ = !missing_from_docs.is_empty() && !stale_in_docs.is_empty();
            let confidence = if both_sides_differ {
                0.85
            } else if mismatch_count > 1 {
                0.80
            } else {
                0.70
            };

            let mut remediation = Vec::new();
            if !missing_from_docs.is_empty() {
                remediation.push(format!(
                    "Document parameter(s): {}",
                    missing_from_docs.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
                ));
            }
            if !stale_in_docs.is_empty() {
                remediation.push(format!(
                    "Remove stale documented parameter(s) no longer in the signature: {}",
                    stale_in_docs.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
                ));
            }

            findings.push(self.build_finding(
                context,
                format!("Documentation for `{name}` no longer matches its parameters"),
                idx + 1,
                idx + 1,
                confidence,
                remediation,
                None,
                vec![Evidence::new("signature/documentation mismatch").with_line(idx + 1).with_snippet(*line)],
                None,
            ));
        }

        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_renamed_param_is_flagged_both_sides() {
        let ctx = CodeRuleContext::new(
            "app.py",
            "def greet(username):\n    \"\"\"\n    :param name: who to greet\n    \"\"\"\n    return username\n",
        );
        let findings = OutdatedDocsRule.check(&ctx).unwrap();
        assert_eq!(findings.len(), 1);
        assert!(findings[0].confidence >= 0.85);
    }

    #[test]
    fn python_matching_docstring_is_not_flagged() {
        let ctx = CodeRuleContext::new(
            "app.py",
            "def greet(name):\n    \"\"\"\n    :param name: who to greet\n    \"\"\"\n    return name\n",
        );
        let findings = OutdatedDocsRule.check(&ctx).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn section_keywords_are_not_treated_as_params() {
        let ctx = CodeRuleContext::new(
            "app.py",
            "def greet(name):\n    \"\"\"\n    :param name: who to greet\n    returns: a greeting\n    \"\"\"\n    return name\n",
        );
        let findings = OutdatedDocsRule.check(&ctx).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn js_added_param_without_jsdoc_update_is_flagged() {
        let ctx = CodeRuleContext::new(
            "app.js",
            "/**\n * @param {string} name\n */\nfunction greet(name, loud) {\n    return name;\n}\n",
        );
        let findings = OutdatedDocsRule.check(&ctx).unwrap();
        assert_eq!(findings.len(), 1);
        assert!(findings[0].confidence >= 0.70 && findings[0].confidence < 0.85);
    }
}

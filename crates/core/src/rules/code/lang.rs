//! Shared helpers used by every code rule family: comment detection, indentation-delimited
//! (offside-rule) block-end detection, and brace-delimited block-end detection (§4.3, §9's
//! "regex compilation" note -- every pattern here is compiled once via `once_cell::sync::Lazy`).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::rule::Language;

pub static TEST_FILE_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(^|/)(tests?|spec|__tests__)(/|_|\.)").unwrap());

pub fn is_test_file(file_path: &str) -> bool {
    TEST_FILE_PATH_RE.is_match(file_path)
}

pub fn indentation_of(line: &str) -> usize {
    line.chars().take_while(|c| *c == ' ' || *c == '\t').count()
}

pub fn is_comment_line(line: &str, language: Language) -> bool {
    let trimmed = line.trim_start();
    match language {
        Language::Python | Language::Bash => trimmed.starts_with('#'),
        Language::JavaScript | Language::TypeScript => {
            trimmed.starts_with("//") || trimmed.starts_with('*') || trimmed.starts_with("/*")
        }
        Language::Other => trimmed.starts_with('#') || trimmed.starts_with("//"),
    }
}

/// Lines `[start_idx, end_idx)` (0-indexed, exclusive end) that form the indentation-delimited
/// block opened by the line at `header_idx` (whose own indentation is `header_indent`).
/// Blank lines inside the block do not end it.
pub fn offside_block(lines: &[&str], header_idx: usize, header_indent: usize) -> (usize, usize) {
    let mut end = header_idx + 1;
    while end < lines.len() {
        let line = lines[end];
        if line.trim().is_empty() {
            end += 1;
            continue;
        }
        if indentation_of(line) <= header_indent {
            break;
        }
        end += 1;
    }
    (header_idx + 1, end)
}

/// Lines `[start_idx, end_idx)` (0-indexed, exclusive end) forming the brace-delimited block
/// whose opening `{` appears on the line at `header_idx` (or a following line, up to
/// `max_lookahead` lines later, for `catch (e)\n{` style). Once the opening brace is located,
/// the matching close is searched for with no further line bound.
pub fn brace_block(lines: &[&str], header_idx: usize, max_lookahead: usize) -> Option<(usize, usize)> {
    let mut depth = 0i32;
    let mut opened = false;
    let mut open_line = header_idx;

    for (offset, line) in lines.iter().enumerate().skip(header_idx) {
        if !opened && offset > header_idx + max_lookahead {
            return None;
        }
        for ch in line.chars() {
            match ch {
                '{' => {
                    depth += 1;
                    opened = true;
                    open_line = offset;
                }
                '}' => {
                    depth -= 1;
                    if opened && depth == 0 {
                        return Some((open_line + 1, offset));
                    }
                }
                _ => {}
            }
        }
        if opened && depth == 0 {
            return Some((open_line + 1, offset));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offside_block_stops_at_dedent() {
        let text = "except Exception:\n    pass\nnext_stmt()\n";
        let lines: Vec<&str> = text.lines().collect();
        let (start, end) = offside_block(&lines, 0, 0);
        assert_eq!(start, 1);
        assert_eq!(end, 2);
    }

    #[test]
    fn offside_block_skips_blank_lines() {
        let text = "except Exception:\n    a()\n\n    b()\nnext_stmt()\n";
        let lines: Vec<&str> = text.lines().collect();
        let (start, end) = offside_block(&lines, 0, 0);
        assert_eq!(start, 1);
        assert_eq!(end, 4);
    }

    #[test]
    fn brace_block_same_line_open() {
        let text = "catch (e) {\n}\nnext();\n";
        let lines: Vec<&str> = text.lines().collect();
        let (start, end) = brace_block(&lines, 0, 2).unwrap();
        assert_eq!(start, 1);
        assert_eq!(end, 1);
    }

    #[test]
    fn brace_block_finds_nested_braces() {
        let text = "catch (e) {\n    if (x) {\n        log(x);\n    }\n}\n";
        let lines: Vec<&str> = text.lines().collect();
        let (start, end) = brace_block(&lines, 0, 2).unwrap();
        assert_eq!(start, 1);
        assert_eq!(end, 4);
    }

    #[test]
    fn test_file_detection() {
        assert!(is_test_file("tests/test_auth.py"));
        assert!(is_test_file("src/auth.test.ts"));
        assert!(!is_test_file("src/auth.py"));
    }
}

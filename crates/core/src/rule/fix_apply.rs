use crate::model::Fix;

/// Applies a set of fixes to a file's content. Sorts by `line_start` descending and replaces
/// the inclusive `[line_start, line_end]` range (1-indexed) with `new_text`'s lines, so an
/// earlier-applied fix never shifts the line numbers a later fix still needs to act on.
///
/// The caller is responsible for avoiding overlaps (§4.2); overlapping fixes are applied in
/// the order given by descending start line, which can silently clobber each other's output.
pub fn apply_fixes(content: &str, fixes: &[Fix]) -> String {
    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
    let trailing_newline = content.ends_with('\n');

    let mut ordered: Vec<&Fix> = fixes.iter().collect();
    ordered.sort_by(|a, b| b.line_start.cmp(&a.line_start));

    for fix in ordered {
        if fix.line_start == 0 || fix.line_start > fix.line_end {
            continue;
        }
        let start_idx = fix.line_start - 1;
        let end_idx = (fix.line_end - 1).min(lines.len().saturating_sub(1));
        if start_idx >= lines.len() {
            continue;
        }
        let replacement: Vec<String> = fix.new_text.lines().map(str::to_string).collect();
        lines.splice(start_idx..=end_idx, replacement);
    }

    let mut out = lines.join("\n");
    if trailing_newline && !out.is_empty() {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_fix_replaces_line_range() {
        let content = "a\nb\nc\n";
        let fixes = vec![Fix::new(2, 2, "b", "B", "uppercase")];
        assert_eq!(apply_fixes(content, &fixes), "a\nB\nc\n");
    }

    #[test]
    fn descending_order_prevents_index_shift() {
        let content = "1\n2\n3\n4\n5\n";
        let fixes = vec![
            Fix::new(2, 2, "2", "TWO", "d"),
            Fix::new(4, 4, "4", "FOUR", "d"),
        ];
        // Deliberately passed in ascending order to prove the applier re-sorts.
        assert_eq!(apply_fixes(content, &fixes), "1\nTWO\n3\nFOUR\n5\n");
    }

    #[test]
    fn multiline_replacement_changes_total_line_count() {
        let content = "try:\n    do()\nexcept Exception:\n    pass\n";
        let fixes = vec![Fix::new(
            3,
            4,
            "except Exception:\n    pass",
            "except Exception as e:\n    logger.exception(e)\n    raise",
            "log and re-raise",
        )];
        let result = apply_fixes(content, &fixes);
        assert!(result.contains("logger.exception(e)"));
        assert!(result.contains("raise"));
    }

    #[test]
    fn equivalent_to_applying_one_at_a_time_descending() {
        let content = "a\nb\nc\nd\ne\n";
        let fixes = vec![
            Fix::new(1, 1, "a", "A", "d"),
            Fix::new(3, 3, "c", "C", "d"),
            Fix::new(5, 5, "e", "E", "d"),
        ];
        let batch = apply_fixes(content, &fixes);

        let mut manual = content.to_string();
        let mut sorted = fixes.clone();
        sorted.sort_by(|a, b| b.line_start.cmp(&a.line_start));
        for f in &sorted {
            manual = apply_fixes(&manual, std::slice::from_ref(f));
        }
        assert_eq!(batch, manual);
    }
}

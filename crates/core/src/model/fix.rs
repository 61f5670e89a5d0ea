use serde::{Deserialize, Serialize};

/// A deterministic text replacement proposed by a code rule. `line_start`/`line_end` are
/// 1-indexed and inclusive, matching the convention used by [`crate::rule::fix_apply::apply_fixes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    pub line_start: usize,
    pub line_end: usize,
    pub old_text: String,
    pub new_text: String,
    pub description: String,
}

impl Fix {
    pub fn new(
        line_start: usize,
        line_end: usize,
        old_text: impl Into<String>,
        new_text: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            line_start,
            line_end,
            old_text: old_text.into(),
            new_text: new_text.into(),
            description: description.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let fix = Fix::new(3, 3, "except Exception:\n    pass", "except Exception:\n    logger.exception(\"swallowed\")", "log the exception");
        let json = serde_json::to_string(&fix).unwrap();
        let back: Fix = serde_json::from_str(&json).unwrap();
        assert_eq!(fix, back);
    }
}

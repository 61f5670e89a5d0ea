use std::path::PathBuf;
use std::sync::Arc;

use crate::plan::ImplementationPlan;
use crate::similarity::SimilaritySearch;

/// A single contiguous range of changed lines, 1-indexed and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffHunk {
    pub start: usize,
    pub end: usize,
}

impl DiffHunk {
    pub fn contains(&self, line: usize) -> bool {
        line >= self.start && line <= self.end
    }
}

/// The supported source languages. Matches §4.3's "offside-rule vs curly-brace"
/// split: Python represents indentation-delimited blocks, JavaScript/TypeScript
/// represents brace-delimited blocks, and Bash is the shell-only family the git
/// rules run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Bash,
    Other,
}

impl Language {
    pub fn detect(file_path: &str) -> Self {
        let lower = file_path.to_ascii_lowercase();
        if lower.ends_with(".py") {
            Language::Python
        } else if lower.ends_with(".ts") || lower.ends_with(".tsx") {
            Language::TypeScript
        } else if lower.ends_with(".js") || lower.ends_with(".jsx") || lower.ends_with(".mjs") {
            Language::JavaScript
        } else if lower.ends_with(".sh") || lower.ends_with(".bash") {
            Language::Bash
        } else {
            Language::Other
        }
    }

    /// Offside-rule (indentation-delimited) vs curly-brace (brace-delimited) family.
    pub fn is_offside_rule(self) -> bool {
        matches!(self, Language::Python)
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Bash => "bash",
            Language::Other => "other",
        }
    }
}

/// Built per-file per-run; discarded after the code rule engine's `run`/`run_fast` returns.
#[derive(Debug, Clone)]
pub struct CodeRuleContext {
    pub file_path: String,
    pub content: String,
    pub language: Language,
    pub diff_hunks: Option<Vec<DiffHunk>>,
}

impl CodeRuleContext {
    pub fn new(file_path: impl Into<String>, content: impl Into<String>) -> Self {
        let file_path = file_path.into();
        let language = Language::detect(&file_path);
        Self {
            file_path,
            content: content.into(),
            language,
            diff_hunks: None,
        }
    }

    pub fn with_diff_hunks(mut self, hunks: Vec<DiffHunk>) -> Self {
        self.diff_hunks = Some(hunks);
        self
    }

    /// Whether `line` should be considered, given the diff restriction. When no diff hunks
    /// are present the whole file is in scope.
    pub fn in_scope(&self, line: usize) -> bool {
        match &self.diff_hunks {
            None => true,
            Some(hunks) => hunks.iter().any(|h| h.contains(line)),
        }
    }

    pub fn lines(&self) -> Vec<&str> {
        self.content.lines().collect()
    }
}

/// Built per-plan per-run by the plan guardrail engine and fed to every [`crate::rule::PlanRule`].
#[derive(Clone)]
pub struct PlanRuleContext {
    pub plan: ImplementationPlan,
    pub project_path: PathBuf,
    pub search_client: Option<Arc<dyn SimilaritySearch>>,
    pub collection_name: String,
    pub source_requirements: String,
}

impl std::fmt::Debug for PlanRuleContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanRuleContext")
            .field("project_path", &self.project_path)
            .field("collection_name", &self.collection_name)
            .field("has_search_client", &self.search_client.is_some())
            .finish()
    }
}

impl PlanRuleContext {
    pub fn new(plan: ImplementationPlan, project_path: impl Into<PathBuf>) -> Self {
        Self {
            plan,
            project_path: project_path.into(),
            search_client: None,
            collection_name: "entities".to_string(),
            source_requirements: String::new(),
        }
    }

    pub fn with_search_client(mut self, client: Arc<dyn SimilaritySearch>, collection_name: impl Into<String>) -> Self {
        self.search_client = Some(client);
        self.collection_name = collection_name.into();
        self
    }
}

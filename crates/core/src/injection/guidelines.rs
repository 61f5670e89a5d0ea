//! §4.6 guidelines generator: a fixed five-section text block, with the architecture section
//! interpolating bullet patterns pulled from a project guideline file.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use once_cell::sync::Lazy;
use regex::Regex;

static PATTERN_HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^#{1,6}\s*(Code Style|Patterns|Conventions|Architecture|Guidelines|Rules|Standards)\b").unwrap());
static BULLET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[-*]\s+(.+)$").unwrap());
static ANY_HEADING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#{1,6}\s").unwrap());

fn default_max_patterns_per_section() -> usize {
    5
}

fn default_max_total_patterns() -> usize {
    15
}

fn default_min_pattern_length() -> usize {
    8
}

fn default_cache_capacity() -> usize {
    32
}

#[derive(Debug, Clone)]
pub struct GuidelinesConfig {
    pub max_patterns_per_section: usize,
    pub max_total_patterns: usize,
    pub min_pattern_length: usize,
    pub cache_capacity: usize,
}

impl Default for GuidelinesConfig {
    fn default() -> Self {
        Self {
            max_patterns_per_section: default_max_patterns_per_section(),
            max_total_patterns: default_max_total_patterns(),
            min_pattern_length: default_min_pattern_length(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

/// Full and compact renderings of the generated guidelines block, plus the patterns that fed
/// the architecture section (§4.6: "the structured `guidelines` result field always reflects
/// the full generation").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedGuidelines {
    pub text: String,
    pub compact_text: String,
    pub patterns: Vec<String>,
}

fn command_prefix(collection_name: &str) -> String {
    format!("search the `{collection_name}` collection")
}

/// §4.6: produces the five-section guidelines block. The project-guideline pattern cache is
/// an owned field, not a global (§5/§9's "prefer ownership to globals").
pub struct GuidelinesGenerator {
    config: GuidelinesConfig,
    cache: RefCell<VecDeque<(PathBuf, SystemTime, Vec<String>)>>,
}

impl GuidelinesGenerator {
    pub fn new(config: GuidelinesConfig) -> Self {
        Self {
            config,
            cache: RefCell::new(VecDeque::new()),
        }
    }

    pub fn generate(&self, project_root: &Path, collection_name: &str) -> GeneratedGuidelines {
        let patterns = self.patterns_for_project(project_root);
        let prefix = command_prefix(collection_name);

        let reuse = format!(
            "## Code reuse\nBefore writing new code, {prefix} for existing functions, classes or implementation patterns that already solve this problem."
        );
        let testing = "## Testing\nEvery non-trivial feature task needs an accompanying test task covering the happy path and at least one edge case or failure mode.".to_string();
        let documentation = "## Documentation\nUser-facing changes (APIs, CLIs, configuration, UI) need an accompanying documentation task.".to_string();
        let architecture = if patterns.is_empty() {
            "## Architecture\nFollow the existing module boundaries and file layout for this project.".to_string()
        } else {
            let bullets: String = patterns.iter().map(|p| format!("- {p}\n")).collect();
            format!("## Architecture\nFollow these project conventions:\n{bullets}")
        };
        let performance = "## Performance\nWatch for N+1 queries, unbounded loops over remote data, and missing caching on hot paths.".to_string();

        let text = [reuse.clone(), testing, documentation, architecture, performance].join("\n\n");
        let compact_text = format!(
            "Reuse existing code ({prefix}), add tests and docs for user-facing changes, follow project conventions, and watch for N+1 queries and unbounded loops."
        );

        GeneratedGuidelines {
            text,
            compact_text,
            patterns,
        }
    }

    /// Tries `<project>/CLAUDE.md` then `<project>/.claude/CLAUDE.md`; the first candidate that
    /// yields any patterns wins (§4.6).
    fn patterns_for_project(&self, project_root: &Path) -> Vec<String> {
        for candidate in [project_root.join("CLAUDE.md"), project_root.join(".claude").join("CLAUDE.md")] {
            let Ok(metadata) = std::fs::metadata(&candidate) else {
                continue;
            };
            let Ok(modified) = metadata.modified() else {
                continue;
            };
            if let Some(cached) = self.cached_patterns(&candidate, modified) {
                if !cached.is_empty() {
                    return cached;
                }
                continue;
            }
            let Ok(content) = std::fs::read_to_string(&candidate) else {
                continue;
            };
            let patterns = self.extract_patterns(&content);
            self.insert_cache(candidate, modified, patterns.clone());
            if !patterns.is_empty() {
                return patterns;
            }
        }
        Vec::new()
    }

    fn cached_patterns(&self, path: &Path, modified: SystemTime) -> Option<Vec<String>> {
        self.cache
            .borrow()
            .iter()
            .find(|(p, m, _)| p == path && *m == modified)
            .map(|(_, _, patterns)| patterns.clone())
    }

    fn insert_cache(&self, path: PathBuf, modified: SystemTime, patterns: Vec<String>) {
        let mut cache = self.cache.borrow_mut();
        if cache.len() >= self.config.cache_capacity {
            cache.pop_front();
        }
        cache.push_back((path, modified, patterns));
    }

    /// Bulleted items under a recognised heading, capped per-section and in total; patterns
    /// shorter than `min_pattern_length` are dropped.
    fn extract_patterns(&self, content: &str) -> Vec<String> {
        let mut patterns = Vec::new();
        let mut in_matching_section = false;
        let mut in_section_count = 0usize;

        for line in content.lines() {
            if ANY_HEADING_RE.is_match(line) {
                in_matching_section = PATTERN_HEADING_RE.is_match(line);
                in_section_count = 0;
                continue;
            }
            if !in_matching_section || in_section_count >= self.config.max_patterns_per_section {
                continue;
            }
            if let Some(caps) = BULLET_RE.captures(line) {
                let item = caps[1].trim().to_string();
                if item.len() >= self.config.min_pattern_length {
                    patterns.push(item);
                    in_section_count += 1;
                    if patterns.len() >= self.config.max_total_patterns {
                        break;
                    }
                }
            }
        }
        patterns
    }
}

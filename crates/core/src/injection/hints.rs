//! §4.6 exploration-hints generator: extracts candidate "entities" from a prompt and turns
//! them into vector-store search hints.

use std::cell::RefCell;
use std::collections::VecDeque;

use once_cell::sync::Lazy;
use regex::Regex;

static CAMEL_CASE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z][a-z0-9]+(?:[A-Z][a-z0-9]*)+\b").unwrap());
static SNAKE_CASE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[a-z][a-z0-9]*(?:_[a-z0-9]+)+\b").unwrap());
static QUOTED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"["']([^"']{3,})["']"#).unwrap());

const TECHNICAL_TERMS: &[&str] = &[
    "api", "database", "cache", "authentication", "authorization", "websocket", "queue", "schema", "migration",
    "endpoint", "middleware", "webhook", "token", "session", "pipeline", "index",
];

fn default_max_entities() -> usize {
    8
}

fn default_top_k_for_architecture() -> usize {
    3
}

fn default_cache_capacity() -> usize {
    64
}

#[derive(Debug, Clone)]
pub struct HintsConfig {
    pub max_entities: usize,
    pub top_k_for_architecture: usize,
    pub cache_capacity: usize,
}

impl Default for HintsConfig {
    fn default() -> Self {
        Self {
            max_entities: default_max_entities(),
            top_k_for_architecture: default_top_k_for_architecture(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

/// Entities extracted from a prompt and the hints built from them (§4.6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorationHints {
    pub entities: Vec<String>,
    pub hints: Vec<String>,
}

fn command_prefix(collection_name: &str) -> String {
    format!("search the `{collection_name}` collection")
}

/// §4.6: entity extraction is cached by prompt string; an owned FIFO-evicted cache, not a
/// global (§5/§9).
pub struct ExplorationHintsGenerator {
    config: HintsConfig,
    cache: RefCell<VecDeque<(String, Vec<String>)>>,
}

impl ExplorationHintsGenerator {
    pub fn new(config: HintsConfig) -> Self {
        Self {
            config,
            cache: RefCell::new(VecDeque::new()),
        }
    }

    pub fn generate(&self, prompt: &str, collection_name: &str) -> ExplorationHints {
        let entities = self.entities_for(prompt);
        let prefix = command_prefix(collection_name);

        let mut hints = Vec::new();
        if let Some(first) = entities.first() {
            hints.push(format!(
                "Before creating `{first}`, {prefix} for similar existing functions, classes or implementation patterns."
            ));
        }

        let test_subject = entities.first().cloned().unwrap_or_else(|| "this feature".to_string());
        hints.push(format!("{prefix} for existing tests related to `{test_subject}`."));

        hints.push(format!("{prefix} for existing documentation that may already cover this change."));

        for entity in entities.iter().take(self.config.top_k_for_architecture) {
            hints.push(format!("{prefix} for architectural patterns and conventions related to `{entity}`."));
        }

        ExplorationHints { entities, hints }
    }

    fn entities_for(&self, prompt: &str) -> Vec<String> {
        if let Some(cached) = self.cache.borrow().iter().find(|(p, _)| p == prompt).map(|(_, e)| e.clone()) {
            return cached;
        }
        let entities = extract_entities(prompt, self.config.max_entities);
        let mut cache = self.cache.borrow_mut();
        if cache.len() >= self.config.cache_capacity {
            cache.pop_front();
        }
        cache.push_back((prompt.to_string(), entities.clone()));
        entities
    }
}

fn extract_entities(prompt: &str, max_entities: usize) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut entities = Vec::new();

    let mut push = |candidate: String, seen: &mut std::collections::HashSet<String>, entities: &mut Vec<String>| {
        if seen.insert(candidate.clone()) {
            entities.push(candidate);
        }
    };

    for m in CAMEL_CASE_RE.find_iter(prompt) {
        push(m.as_str().to_string(), &mut seen, &mut entities);
    }
    for m in SNAKE_CASE_RE.find_iter(prompt) {
        push(m.as_str().to_string(), &mut seen, &mut entities);
    }
    for caps in QUOTED_RE.captures_iter(prompt) {
        push(caps[1].to_string(), &mut seen, &mut entities);
    }
    let lower = prompt.to_ascii_lowercase();
    for term in TECHNICAL_TERMS {
        if lower.contains(term) {
            push(term.to_string(), &mut seen, &mut entities);
        }
    }

    entities.truncate(max_entities);
    entities
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_camel_case_and_snake_case_identifiers() {
        let entities = extract_entities("Refactor AuthService to use token_store instead", 8);
        assert!(entities.contains(&"AuthService".to_string()));
        assert!(entities.contains(&"token_store".to_string()));
    }

    #[test]
    fn extracts_quoted_terms_and_technical_terms() {
        let entities = extract_entities("Add a 'rate limiter' around the api endpoint", 8);
        assert!(entities.contains(&"rate limiter".to_string()));
        assert!(entities.contains(&"api".to_string()));
        assert!(entities.contains(&"endpoint".to_string()));
    }

    #[test]
    fn duplicate_check_hint_only_emitted_with_entities() {
        let generator = ExplorationHintsGenerator::new(HintsConfig::default());
        let no_entities = generator.generate("fix", "entities");
        assert!(no_entities.entities.is_empty());
        assert!(!no_entities.hints.iter().any(|h| h.starts_with("Before creating")));

        let with_entities = generator.generate("Implement AuthService", "entities");
        assert!(with_entities.hints.iter().any(|h| h.starts_with("Before creating")));
    }

    #[test]
    fn test_and_doc_hints_are_always_emitted() {
        let generator = ExplorationHintsGenerator::new(HintsConfig::default());
        let result = generator.generate("fix", "entities");
        assert_eq!(result.hints.len(), 2);
    }

    #[test]
    fn repeated_prompt_uses_cache() {
        let generator = ExplorationHintsGenerator::new(HintsConfig::default());
        let first = generator.generate("Implement AuthService", "entities");
        let second = generator.generate("Implement AuthService", "entities");
        assert_eq!(first, second);
        assert_eq!(generator.cache.borrow().len(), 1);
    }
}

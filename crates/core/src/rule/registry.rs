use std::collections::HashMap;

use thiserror::Error;

use super::{CodeRule, PlanRule};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate rule id registered: {0}")]
    DuplicateId(String),
}

/// Closed, statically enumerated table of code rules, keyed by id and indexed by category
/// (§4.1, "Rust realisation"). Construction discovers (i.e. registers) rules once; evaluation
/// must not mutate it afterwards.
pub struct CodeRuleRegistry {
    rules: Vec<Box<dyn CodeRule>>,
    by_id: HashMap<&'static str, usize>,
    by_category: HashMap<&'static str, Vec<usize>>,
}

impl CodeRuleRegistry {
    pub fn builder() -> CodeRuleRegistryBuilder {
        CodeRuleRegistryBuilder::default()
    }

    pub fn rules(&self) -> &[Box<dyn CodeRule>] {
        &self.rules
    }

    pub fn get(&self, rule_id: &str) -> Option<&dyn CodeRule> {
        self.by_id.get(rule_id).map(|&i| self.rules[i].as_ref())
    }

    pub fn by_category(&self, category: &str) -> Vec<&dyn CodeRule> {
        self.by_category
            .get(category)
            .map(|idxs| idxs.iter().map(|&i| self.rules[i].as_ref()).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[derive(Default)]
pub struct CodeRuleRegistryBuilder {
    rules: Vec<Box<dyn CodeRule>>,
}

impl CodeRuleRegistryBuilder {
    pub fn register(mut self, rule: Box<dyn CodeRule>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn build(self) -> Result<CodeRuleRegistry, RegistryError> {
        let mut by_id = HashMap::new();
        let mut by_category: HashMap<&'static str, Vec<usize>> = HashMap::new();
        for (i, rule) in self.rules.iter().enumerate() {
            let id = rule.rule_id();
            if by_id.insert(id, i).is_some() {
                return Err(RegistryError::DuplicateId(id.to_string()));
            }
            by_category.entry(rule.category()).or_default().push(i);
        }
        Ok(CodeRuleRegistry {
            rules: self.rules,
            by_id,
            by_category,
        })
    }
}

/// Mirrors [`CodeRuleRegistry`] for the plan-validation rule family.
pub struct PlanRuleRegistry {
    rules: Vec<Box<dyn PlanRule>>,
    by_id: HashMap<&'static str, usize>,
    by_category: HashMap<&'static str, Vec<usize>>,
}

impl PlanRuleRegistry {
    pub fn builder() -> PlanRuleRegistryBuilder {
        PlanRuleRegistryBuilder::default()
    }

    pub fn rules(&self) -> &[Box<dyn PlanRule>] {
        &self.rules
    }

    pub fn get(&self, rule_id: &str) -> Option<&dyn PlanRule> {
        self.by_id.get(rule_id).map(|&i| self.rules[i].as_ref())
    }

    pub fn by_category(&self, category: &str) -> Vec<&dyn PlanRule> {
        self.by_category
            .get(category)
            .map(|idxs| idxs.iter().map(|&i| self.rules[i].as_ref()).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[derive(Default)]
pub struct PlanRuleRegistryBuilder {
    rules: Vec<Box<dyn PlanRule>>,
}

impl PlanRuleRegistryBuilder {
    pub fn register(mut self, rule: Box<dyn PlanRule>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn build(self) -> Result<PlanRuleRegistry, RegistryError> {
        let mut by_id = HashMap::new();
        let mut by_category: HashMap<&'static str, Vec<usize>> = HashMap::new();
        for (i, rule) in self.rules.iter().enumerate() {
            let id = rule.rule_id();
            if by_id.insert(id, i).is_some() {
                return Err(RegistryError::DuplicateId(id.to_string()));
            }
            by_category.entry(rule.category()).or_default().push(i);
        }
        Ok(PlanRuleRegistry {
            rules: self.rules,
            by_id,
            by_category,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CodeFinding, Severity, Trigger};
    use crate::rule::CodeRuleContext;

    struct DummyRule(&'static str, &'static str);

    impl CodeRule for DummyRule {
        fn rule_id(&self) -> &'static str {
            self.0
        }
        fn name(&self) -> &'static str {
            self.0
        }
        fn category(&self) -> &'static str {
            self.1
        }
        fn default_severity(&self) -> Severity {
            Severity::Low
        }
        fn triggers(&self) -> &'static [Trigger] {
            &[Trigger::OnWrite]
        }
        fn description(&self) -> &'static str {
            "dummy"
        }
        fn check(&self, _context: &CodeRuleContext) -> anyhow::Result<Vec<CodeFinding>> {
            Ok(vec![])
        }
    }

    #[test]
    fn builds_registry_and_indexes_by_category() {
        let registry = CodeRuleRegistry::builder()
            .register(Box::new(DummyRule("A.ONE", "resilience")))
            .register(Box::new(DummyRule("A.TWO", "resilience")))
            .register(Box::new(DummyRule("B.ONE", "git")))
            .build()
            .unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.by_category("resilience").len(), 2);
        assert_eq!(registry.by_category("git").len(), 1);
        assert!(registry.get("A.ONE").is_some());
    }

    #[test]
    fn duplicate_id_fails_registration() {
        let result = CodeRuleRegistry::builder()
            .register(Box::new(DummyRule("A.ONE", "resilience")))
            .register(Box::new(DummyRule("A.ONE", "git")))
            .build();
        assert!(matches!(result, Err(RegistryError::DuplicateId(id)) if id == "A.ONE"));
    }
}

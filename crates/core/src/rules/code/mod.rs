//! Concrete `CodeRule` implementations (§4.3) and the registry builder that wires them
//! into a [`crate::rule::registry::CodeRuleRegistry`] in a fixed, documented order.

mod documentation;
mod git;
mod lang;
mod resilience;

pub use documentation::OutdatedDocsRule;
pub use git::{DestructiveOpsRule, ForcePushRule, HardResetRule};
pub use resilience::{MissingRetryRule, SwallowedExceptionsRule};

use crate::rule::registry::{CodeRuleRegistry, RegistryError};

/// Every built-in code rule, in the order they'll appear in the registry and in any listing
/// surfaced to a caller. Adding a rule means adding one line here.
pub fn default_registry() -> Result<CodeRuleRegistry, RegistryError> {
    CodeRuleRegistry::builder()
        .register(Box::new(SwallowedExceptionsRule))
        .register(Box::new(MissingRetryRule))
        .register(Box::new(OutdatedDocsRule))
        .register(Box::new(ForcePushRule))
        .register(Box::new(HardResetRule))
        .register(Box::new(DestructiveOpsRule))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_builds_without_duplicate_ids() {
        let registry = default_registry().unwrap();
        assert_eq!(registry.len(), 6);
        assert!(registry.get("RESILIENCE.SWALLOWED_EXCEPTIONS").is_some());
        assert!(registry.get("GIT.FORCE_PUSH").is_some());
    }
}

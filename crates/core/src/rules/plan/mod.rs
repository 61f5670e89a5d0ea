//! Concrete `PlanRule` implementations (§4.9) and the registry builder that wires them into a
//! [`crate::rule::registry::PlanRuleRegistry`] in a fixed, documented order.

mod architectural_consistency;
mod doc_requirement;
mod duplicate_detection;
mod performance_pattern;
mod test_requirement;

pub use architectural_consistency::ArchitecturalConsistencyRule;
pub use doc_requirement::DocRequirementRule;
pub use duplicate_detection::DuplicateDetectionRule;
pub use performance_pattern::PerformancePatternRule;
pub use test_requirement::TestRequirementRule;

use crate::rule::registry::{PlanRuleRegistry, RegistryError};

/// Every built-in plan rule, in the order they'll appear in the registry and in any listing
/// surfaced to a caller. Adding a rule means adding one line here.
pub fn default_registry() -> Result<PlanRuleRegistry, RegistryError> {
    PlanRuleRegistry::builder()
        .register(Box::new(TestRequirementRule))
        .register(Box::new(DocRequirementRule))
        .register(Box::new(DuplicateDetectionRule::default()))
        .register(Box::new(ArchitecturalConsistencyRule))
        .register(Box::new(PerformancePatternRule))
        .build()
}

//! §4.6/§4.7: user-prompt context injection and generated-plan QA verification.

pub mod guidelines;
pub mod hints;
pub mod injector;
pub mod plan_qa;

pub use guidelines::{GeneratedGuidelines, GuidelinesConfig, GuidelinesGenerator};
pub use hints::{ExplorationHints, HintsConfig, ExplorationHintsGenerator};
pub use injector::{ContextInjector, InjectedContext, InjectorConfig};
pub use plan_qa::{PlanQAConfig, PlanQAResult, PlanQAVerifier};

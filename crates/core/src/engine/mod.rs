pub mod code_engine;
pub mod plan_engine;

pub use code_engine::{CodeRuleEngine, ConfigError, EngineResult, RuleEngineConfig};
pub use plan_engine::{PlanEngineResult, PlanGuardrailConfig, PlanGuardrailEngine};

pub mod design;
pub mod engine;
pub mod hooks;
pub mod injection;
pub mod model;
pub mod plan;
pub mod plan_mode;
pub mod revision;
pub mod rule;
pub mod rules;
pub mod similarity;

pub use injection::{ContextInjector, InjectorConfig};
pub use model::{CodeFinding, Evidence, Fix, PlanFinding, Revision, RevisionKind, Severity, Trigger};
pub use plan::{Effort, ImplementationPlan, PlanSnapshot, Task, TaskGroup};
pub use plan_mode::{detect_plan_mode, PlanModeContext, PlanModeDetector};
pub use revision::{AutoRevisionEngine, PlanStore, RevisionHistoryManager};
pub use rule::{CodeRule, PlanRule};
pub use similarity::{NullSimilaritySearch, SimilaritySearch};

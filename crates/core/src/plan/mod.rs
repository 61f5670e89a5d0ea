pub mod group;
pub mod implementation_plan;
pub mod snapshot;
pub mod task;

pub use group::TaskGroup;
pub use implementation_plan::{AppliedRevision, ImplementationPlan};
pub use snapshot::PlanSnapshot;
pub use task::{Effort, Task};

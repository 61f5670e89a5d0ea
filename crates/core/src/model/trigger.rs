use serde::{Deserialize, Serialize};

/// Lifecycle event that can cause a code rule to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Trigger {
    OnWrite,
    OnStop,
    OnCommit,
}

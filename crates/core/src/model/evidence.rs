use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single piece of supporting material attached to a finding during `check()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub description: String,
    #[serde(default)]
    pub line: Option<usize>,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
}

impl Evidence {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            line: None,
            snippet: None,
            data: HashMap::new(),
        }
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

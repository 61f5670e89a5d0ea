//! §4.4 data model: the heterogeneous "entity" set produced by the design-document parser,
//! modelled as a tagged variant with common fields plus kind-specific payload (§9 design note).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The four recognised design-document kinds (§4.4 kind detection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocKind {
    Prd,
    Tdd,
    Adr,
    Spec,
}

impl DocKind {
    /// Lowercase form used in entity metadata and chunk ids (`"prd"`, `"tdd"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            DocKind::Prd => "prd",
            DocKind::Tdd => "tdd",
            DocKind::Adr => "adr",
            DocKind::Spec => "spec",
        }
    }

    /// Uppercase label used in the document entity's name and observations.
    pub fn label(self) -> &'static str {
        match self {
            DocKind::Prd => "PRD",
            DocKind::Tdd => "TDD",
            DocKind::Adr => "ADR",
            DocKind::Spec => "SPEC",
        }
    }
}

/// Classification of an extracted requirement. A bracketed `[REQ-n]` match is always
/// `General` regardless of any modal verb incidentally present in its captured text --
/// only the RFC-2119-bulleted and numbered-normative-verb patterns participate in
/// MUST/SHOULD/MAY classification (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequirementKind {
    Mandatory,
    Recommended,
    Optional,
    General,
}

impl RequirementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RequirementKind::Mandatory => "mandatory",
            RequirementKind::Recommended => "recommended",
            RequirementKind::Optional => "optional",
            RequirementKind::General => "general",
        }
    }
}

/// Chunk kind per §3's Data Model table (`{metadata, implementation}`). The parser only
/// ever emits `Implementation` chunks; `Metadata` exists for the shared type's completeness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Metadata,
    Implementation,
}

/// Kind-specific payload for a [`DesignEntity`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityKind {
    Document { doc_kind: DocKind },
    Section { heading_level: usize },
    Requirement { requirement_kind: RequirementKind, parent_section: Option<String> },
    /// Fallback emitted when no document kind matches (§4.4: "the parser emits only a file
    /// entity and returns -- letting a generic markdown parser take over").
    File { content_type: String, parsing_method: String },
}

/// One entity produced by [`super::parser::DesignDocParser`]: the document itself, one of
/// its sections, or one extracted requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignEntity {
    pub name: String,
    pub file_path: String,
    pub line_number: usize,
    #[serde(default)]
    pub observations: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    pub kind: EntityKind,
}

/// A directed `contains` edge between two entity names (document->section, section->requirement,
/// or document->requirement when a requirement precedes any section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub from: String,
    pub to: String,
    pub relation_type: String,
}

impl Relation {
    pub fn contains(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            relation_type: "contains".to_string(),
        }
    }
}

/// An indexable content chunk anchored to one entity (§3: "id; entity name; chunk kind; content;
/// metadata map").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub entity_name: String,
    pub chunk_kind: ChunkKind,
    pub content: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

//! Interface to the external vector store. §6: "the system never writes through this
//! interface (writes happen elsewhere in the indexer)" -- only `search` is modelled here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One hit returned by a similarity search against the vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub score: f64,
    pub name: String,
    pub entity_type: String,
    pub file_path: String,
    pub content: String,
}

/// Consumed by [`crate::rules::plan::duplicate_detection::DuplicateDetectionRule`] and the
/// exploration-hints generator. The real client lives outside this crate (out of scope
/// collaborator); `NullSimilaritySearch` below is the test double used by unit tests.
#[async_trait]
pub trait SimilaritySearch: Send + Sync {
    async fn search(
        &self,
        collection_name: &str,
        query_text: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<SimilarityResult>>;
}

/// A client that always returns no results, useful both as a default and to exercise the
/// "external search failure / absence of a configured client degrades to empty" contract.
#[derive(Debug, Default, Clone)]
pub struct NullSimilaritySearch;

#[async_trait]
impl SimilaritySearch for NullSimilaritySearch {
    async fn search(
        &self,
        _collection_name: &str,
        _query_text: &str,
        _limit: usize,
    ) -> anyhow::Result<Vec<SimilarityResult>> {
        Ok(Vec::new())
    }
}

/// A client backed by a fixed, in-memory result set -- used by tests that need
/// `DUPLICATE_DETECTION` to actually fire.
#[derive(Debug, Default, Clone)]
pub struct FixedSimilaritySearch {
    pub results: Vec<SimilarityResult>,
}

#[async_trait]
impl SimilaritySearch for FixedSimilaritySearch {
    async fn search(
        &self,
        _collection_name: &str,
        _query_text: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<SimilarityResult>> {
        Ok(self.results.iter().take(limit).cloned().collect())
    }
}

use crate::error::SearchError;
use crate::models::{NewsChunk, ScoredChunk, SearchParams};
use async_trait::async_trait;
use std::collections::HashSet;

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Keyed by chunk_id; last write wins.
    async fn upsert_chunks(&self, chunks: &[NewsChunk]) -> Result<(), SearchError>;

    async fn existing_chunk_ids(
        &self,
        chunk_ids: &[String],
    ) -> Result<HashSet<String>, SearchError>;

    /// Chunks whose cosine similarity strictly exceeds `params.threshold`,
    /// ordered descending, capped at `params.limit`.
    async fn search(
        &self,
        query_vector: &[f32],
        params: &SearchParams,
    ) -> Result<Vec<ScoredChunk>, SearchError>;
}

use crate::embeddings::Embedder;
use crate::error::{EmbedError, SearchError};
use crate::expand::QueryExpander;
use crate::models::{
    QueryVariant, RetrievalCandidate, RetrievalOutcome, SearchParams, StockProfile,
};
use crate::traits::VectorStore;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct RetrievalConfig {
    pub overall_cap: usize,
    pub probe_limit: usize,
    pub relaxation_margin: f64,
    pub threshold_floor: f64,
    /// Expiry degrades to partial results, never an error.
    pub timeout: Option<Duration>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            overall_cap: 50,
            probe_limit: 5,
            relaxation_margin: 0.1,
            threshold_floor: 0.1,
            timeout: None,
        }
    }
}

pub struct RetrievalCoordinator<S, E> {
    store: S,
    embedder: E,
    expander: QueryExpander,
    config: RetrievalConfig,
}

impl<S, E> RetrievalCoordinator<S, E>
where
    S: VectorStore,
    E: Embedder,
{
    pub fn new(store: S, embedder: E) -> Self {
        Self {
            store,
            embedder,
            expander: QueryExpander::default(),
            config: RetrievalConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_expander(mut self, expander: QueryExpander) -> Self {
        self.expander = expander;
        self
    }

    pub async fn retrieve(
        &self,
        stock_code: &str,
        profile: Option<&StockProfile>,
        published_before: Option<DateTime<Utc>>,
    ) -> Result<RetrievalOutcome, SearchError> {
        let variants = self.expander.expand(stock_code, profile);
        let deadline = self.config.timeout.map(|timeout| Instant::now() + timeout);

        let mut collected = Vec::new();
        let mut diagnostics = Vec::new();
        let mut variants_run = 0usize;
        let mut variants_failed = 0usize;

        for (index, variant) in variants.iter().enumerate() {
            let remaining = deadline.map(|deadline| deadline.saturating_duration_since(Instant::now()));
            if remaining.is_some_and(|left| left.is_zero()) {
                let unstarted = variants.len() - index;
                variants_failed += unstarted;
                diagnostics.push(format!(
                    "retrieval deadline reached, {unstarted} variant(s) not attempted"
                ));
                warn!(stock_code, unstarted, "retrieval deadline reached");
                break;
            }

            variants_run += 1;
            let search = self.run_variant(variant, published_before);
            let outcome = match remaining {
                Some(left) => match tokio::time::timeout(left, search).await {
                    Ok(result) => result,
                    Err(_) => {
                        variants_failed += 1;
                        diagnostics.push(format!(
                            "variant '{}' ({}) timed out",
                            variant.query,
                            variant.kind.as_str()
                        ));
                        warn!(query = %variant.query, kind = variant.kind.as_str(), "variant timed out");
                        continue;
                    }
                },
                None => search.await,
            };

            match outcome {
                Ok(candidates) => collected.extend(candidates),
                Err(
                    error @ (SearchError::DimensionMismatch { .. }
                    | SearchError::Embedding(EmbedError::DimensionMismatch { .. })),
                ) => return Err(error),
                Err(error) => {
                    variants_failed += 1;
                    diagnostics.push(format!(
                        "variant '{}' ({}) failed: {error}",
                        variant.query,
                        variant.kind.as_str()
                    ));
                    warn!(query = %variant.query, kind = variant.kind.as_str(), %error, "variant skipped");
                }
            }
        }

        let mut candidates = dedupe_candidates(collected);
        rank_candidates(&mut candidates);
        candidates.truncate(self.config.overall_cap);

        Ok(RetrievalOutcome {
            candidates,
            variants_run,
            variants_failed,
            degraded: variants_failed > 0,
            diagnostics,
        })
    }

    async fn run_variant(
        &self,
        variant: &QueryVariant,
        published_before: Option<DateTime<Utc>>,
    ) -> Result<Vec<RetrievalCandidate>, SearchError> {
        let query_vector = self.embedder.embed(&variant.query).await?;

        // Cosine similarity is bounded below by -1, so a -1.0 threshold
        // never filters.
        let probe = self
            .store
            .search(
                &query_vector,
                &SearchParams {
                    threshold: -1.0,
                    limit: self.config.probe_limit,
                    published_before,
                },
            )
            .await?;

        let Some(max_observed) = probe
            .iter()
            .map(|hit| hit.similarity)
            .max_by(f64::total_cmp)
        else {
            return Ok(Vec::new());
        };

        let threshold = effective_threshold(
            variant.threshold,
            max_observed,
            self.config.threshold_floor,
            self.config.relaxation_margin,
        );

        let hits = self
            .store
            .search(
                &query_vector,
                &SearchParams {
                    threshold,
                    limit: variant.top_k,
                    published_before,
                },
            )
            .await?;

        Ok(hits
            .into_iter()
            .map(|hit| RetrievalCandidate {
                chunk_id: hit.chunk_id,
                title: hit.title,
                text: hit.text,
                published_at: hit.published_at,
                similarity: hit.similarity,
                kind: variant.kind,
            })
            .collect())
    }
}

/// Relaxes `configured` to `max_observed - margin` (never below `floor`)
/// when the corpus cannot reach it. Never raises a threshold.
pub fn effective_threshold(configured: f64, max_observed: f64, floor: f64, margin: f64) -> f64 {
    if max_observed >= configured {
        configured
    } else {
        (max_observed - margin).max(floor)
    }
}

/// Keeps the best-scoring occurrence per chunk_id; score ties go to the
/// higher-priority variant.
pub fn dedupe_candidates(candidates: Vec<RetrievalCandidate>) -> Vec<RetrievalCandidate> {
    let mut best: HashMap<String, RetrievalCandidate> = HashMap::new();

    for candidate in candidates {
        match best.get(&candidate.chunk_id) {
            Some(existing)
                if existing.similarity > candidate.similarity
                    || (existing.similarity == candidate.similarity
                        && existing.kind.priority() <= candidate.kind.priority()) => {}
            _ => {
                best.insert(candidate.chunk_id.clone(), candidate);
            }
        }
    }

    best.into_values().collect()
}

pub fn rank_candidates(candidates: &mut [RetrievalCandidate]) {
    candidates.sort_by(|left, right| right.similarity.total_cmp(&left.similarity));
}

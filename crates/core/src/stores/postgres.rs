use crate::error::SearchError;
use crate::models::{NewsChunk, ScoredChunk, SearchParams};
use crate::retry::RetryPolicy;
use crate::traits::VectorStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use std::collections::HashSet;

/// Scoped to a single embedding model: every read and write filters on
/// `embedding_model`, so a result set never mixes embedding spaces.
pub struct PgVectorStore {
    pool: PgPool,
    dimensions: usize,
    embedding_model: String,
    retry: RetryPolicy,
}

pub(crate) fn transient(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut)
}

impl PgVectorStore {
    pub fn new(pool: PgPool, dimensions: usize, embedding_model: impl Into<String>) -> Self {
        Self {
            pool,
            dimensions,
            embedding_model: embedding_model.into(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Idempotent; safe to call at every startup.
    pub async fn ensure_schema(&self) -> Result<(), SearchError> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await?;

        // The vector dimension is part of the column type.
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS news_chunks (
                chunk_id text PRIMARY KEY,
                document_id uuid NOT NULL,
                chunk_index integer NOT NULL,
                title text NOT NULL,
                chunk_text text NOT NULL,
                embedding vector({}) NOT NULL,
                embedding_model text NOT NULL,
                published_at timestamptz NOT NULL
            )",
            self.dimensions
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS news_chunks_embedding_idx
             ON news_chunks USING ivfflat (embedding vector_cosine_ops) WITH (lists = 100)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS news_chunks_published_at_idx
             ON news_chunks (published_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<(), SearchError> {
        if vector.len() != self.dimensions {
            return Err(SearchError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    async fn upsert_row(&self, chunk: &NewsChunk) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO news_chunks
                (chunk_id, document_id, chunk_index, title, chunk_text,
                 embedding, embedding_model, published_at)
             VALUES ($1, $2, $3, $4, $5, $6::vector, $7, $8)
             ON CONFLICT (chunk_id) DO UPDATE SET
                document_id = EXCLUDED.document_id,
                chunk_index = EXCLUDED.chunk_index,
                title = EXCLUDED.title,
                chunk_text = EXCLUDED.chunk_text,
                embedding = EXCLUDED.embedding,
                embedding_model = EXCLUDED.embedding_model,
                published_at = EXCLUDED.published_at",
        )
        .bind(&chunk.chunk_id)
        .bind(chunk.document_id)
        .bind(chunk.chunk_index as i32)
        .bind(&chunk.title)
        .bind(&chunk.text)
        .bind(vector_literal(&chunk.embedding))
        .bind(&chunk.embedding_model)
        .bind(chunk.published_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn select_existing(&self, chunk_ids: &[String]) -> Result<Vec<PgRow>, sqlx::Error> {
        sqlx::query(
            "SELECT chunk_id FROM news_chunks
             WHERE chunk_id = ANY($1) AND embedding_model = $2",
        )
        .bind(chunk_ids)
        .bind(&self.embedding_model)
        .fetch_all(&self.pool)
        .await
    }

    async fn select_similar(
        &self,
        query_literal: &str,
        params: &SearchParams,
    ) -> Result<Vec<PgRow>, sqlx::Error> {
        sqlx::query(
            "SELECT chunk_id, title, chunk_text, published_at,
                    1 - (embedding <=> $1::vector) AS similarity
             FROM news_chunks
             WHERE embedding_model = $2
               AND ($3::timestamptz IS NULL OR published_at < $3)
               AND 1 - (embedding <=> $1::vector) > $4
             ORDER BY embedding <=> $1::vector
             LIMIT $5",
        )
        .bind(query_literal)
        .bind(&self.embedding_model)
        .bind(params.published_before)
        .bind(params.threshold)
        .bind(params.limit as i64)
        .fetch_all(&self.pool)
        .await
    }
}

/// pgvector's text input format: `[v1,v2,...]`.
pub(crate) fn vector_literal(vector: &[f32]) -> String {
    let mut literal = String::with_capacity(vector.len() * 10 + 2);
    literal.push('[');
    for (index, value) in vector.iter().enumerate() {
        if index > 0 {
            literal.push(',');
        }
        literal.push_str(&value.to_string());
    }
    literal.push(']');
    literal
}

#[async_trait]
impl VectorStore for PgVectorStore {
    async fn upsert_chunks(&self, chunks: &[NewsChunk]) -> Result<(), SearchError> {
        for chunk in chunks {
            self.check_dimensions(&chunk.embedding)?;
            self.retry.run(|| self.upsert_row(chunk), transient).await?;
        }
        Ok(())
    }

    async fn existing_chunk_ids(
        &self,
        chunk_ids: &[String],
    ) -> Result<HashSet<String>, SearchError> {
        if chunk_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let rows = self
            .retry
            .run(|| self.select_existing(chunk_ids), transient)
            .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("chunk_id"))
            .collect::<Result<HashSet<_>, _>>()
            .map_err(SearchError::from)
    }

    async fn search(
        &self,
        query_vector: &[f32],
        params: &SearchParams,
    ) -> Result<Vec<ScoredChunk>, SearchError> {
        self.check_dimensions(query_vector)?;

        let literal = vector_literal(query_vector);
        let rows = self
            .retry
            .run(|| self.select_similar(&literal, params), transient)
            .await?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in rows {
            hits.push(ScoredChunk {
                chunk_id: row.try_get("chunk_id")?,
                title: row.try_get("title")?,
                text: row.try_get("chunk_text")?,
                published_at: row.try_get::<DateTime<Utc>, _>("published_at")?,
                similarity: row.try_get("similarity")?,
            });
        }

        Ok(hits)
    }
}

use crate::chunking::{ChunkingConfig, TokenChunker};
use crate::embeddings::Embedder;
use crate::error::{EmbedError, IngestError};
use crate::models::{NewsChunk, NewsDocument};
use crate::traits::VectorStore;
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub struct IngestionOptions {
    pub chunking: ChunkingConfig,
    pub batch_size: usize,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            batch_size: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestStats {
    pub chunks_total: usize,
    pub chunks_embedded: usize,
    pub chunks_skipped_existing: usize,
    pub chunks_failed: usize,
}

impl IngestStats {
    fn absorb(&mut self, other: IngestStats) {
        self.chunks_total += other.chunks_total;
        self.chunks_embedded += other.chunks_embedded;
        self.chunks_skipped_existing += other.chunks_skipped_existing;
        self.chunks_failed += other.chunks_failed;
    }
}

#[derive(Debug)]
pub struct SkippedDocument {
    pub document_id: Uuid,
    pub title: String,
    pub reason: String,
}

#[derive(Debug)]
pub struct IngestionReport {
    pub documents_ingested: usize,
    pub stats: IngestStats,
    pub skipped: Vec<SkippedDocument>,
}

/// Same document, position and text always hash to the same id.
pub fn chunk_id(document_id: &Uuid, chunk_index: u32, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document_id.as_bytes());
    hasher.update(chunk_index.to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub struct IngestionPipeline<S, E> {
    store: S,
    embedder: E,
    chunker: TokenChunker,
    batch_size: usize,
}

impl<S, E> IngestionPipeline<S, E>
where
    S: VectorStore,
    E: Embedder,
{
    pub fn new(store: S, embedder: E, options: IngestionOptions) -> Result<Self, IngestError> {
        Ok(Self {
            store,
            embedder,
            chunker: TokenChunker::new(options.chunking)?,
            batch_size: options.batch_size.max(1),
        })
    }

    pub async fn ingest(&self, document: &NewsDocument) -> Result<IngestStats, IngestError> {
        let full_text = format!("{}\n\n{}", document.title, document.body);

        let windows: Vec<String> = self
            .chunker
            .chunk(&full_text)
            .into_iter()
            .filter(|window| !window.trim().is_empty())
            .collect();

        if windows.is_empty() {
            return Err(IngestError::EmptyDocument);
        }

        let ids: Vec<String> = windows
            .iter()
            .enumerate()
            .map(|(index, text)| chunk_id(&document.document_id, index as u32, text))
            .collect();
        let existing = self.store.existing_chunk_ids(&ids).await?;

        let mut stats = IngestStats {
            chunks_total: windows.len(),
            ..IngestStats::default()
        };
        let mut batch: Vec<NewsChunk> = Vec::new();

        for (index, text) in windows.into_iter().enumerate() {
            let id = &ids[index];
            if existing.contains(id) {
                stats.chunks_skipped_existing += 1;
                continue;
            }

            let embedding = match self.embedder.embed(&text).await {
                Ok(embedding) => embedding,
                Err(error @ EmbedError::DimensionMismatch { .. }) => {
                    return Err(error.into());
                }
                Err(error) => {
                    stats.chunks_failed += 1;
                    warn!(
                        document_id = %document.document_id,
                        chunk_index = index,
                        %error,
                        "chunk skipped after embedding failure"
                    );
                    continue;
                }
            };

            batch.push(NewsChunk {
                chunk_id: id.clone(),
                document_id: document.document_id,
                chunk_index: index as u32,
                title: document.title.clone(),
                text,
                embedding,
                embedding_model: self.embedder.model().to_string(),
                published_at: document.published_at,
            });
            stats.chunks_embedded += 1;

            if batch.len() >= self.batch_size {
                self.store.upsert_chunks(&batch).await?;
                batch.clear();
            }
        }

        if !batch.is_empty() {
            self.store.upsert_chunks(&batch).await?;
        }

        info!(
            document_id = %document.document_id,
            chunks_total = stats.chunks_total,
            chunks_embedded = stats.chunks_embedded,
            chunks_skipped = stats.chunks_skipped_existing,
            "document ingested"
        );

        Ok(stats)
    }

    /// A failing document is recorded and skipped, never aborts the rest.
    pub async fn ingest_all(&self, documents: &[NewsDocument]) -> IngestionReport {
        let mut report = IngestionReport {
            documents_ingested: 0,
            stats: IngestStats::default(),
            skipped: Vec::new(),
        };

        for document in documents {
            match self.ingest(document).await {
                Ok(stats) => {
                    report.documents_ingested += 1;
                    report.stats.absorb(stats);
                }
                Err(error) => {
                    warn!(
                        document_id = %document.document_id,
                        %error,
                        "document skipped"
                    );
                    report.skipped.push(SkippedDocument {
                        document_id: document.document_id,
                        title: document.title.clone(),
                        reason: error.to_string(),
                    });
                }
            }
        }

        report
    }
}

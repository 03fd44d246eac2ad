pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod expand;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod retry;
pub mod stores;
pub mod traits;

pub use chunking::{ChunkingConfig, TokenChunker};
pub use embeddings::{
    Embedder, HashedNgramEmbedder, OpenAiEmbedder, DEFAULT_EMBEDDING_DIMENSIONS,
    DEFAULT_EMBEDDING_MODEL,
};
pub use error::{EmbedError, IngestError, SearchError};
pub use expand::{ExpansionConfig, QueryExpander, VariantBudget};
pub use ingest::{
    IngestStats, IngestionOptions, IngestionPipeline, IngestionReport, SkippedDocument,
};
pub use models::{
    NewsChunk, NewsDocument, QueryVariant, RetrievalCandidate, RetrievalOutcome, ScoredChunk,
    SearchParams, StockProfile, VariantKind,
};
pub use orchestrator::{
    dedupe_candidates, effective_threshold, rank_candidates, RetrievalConfig,
    RetrievalCoordinator,
};
pub use retry::RetryPolicy;
pub use stores::PgVectorStore;
pub use traits::VectorStore;

use chrono::{DateTime, NaiveDateTime, Utc};
use clap::{Parser, Subcommand};
use news_rag_core::{
    Embedder, HashedNgramEmbedder, IngestionOptions, IngestionPipeline, NewsDocument,
    OpenAiEmbedder, PgVectorStore, RetrievalConfig, RetrievalCoordinator, StockProfile,
    DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL,
};
use serde::Deserialize;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "news-rag", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Postgres connection string (requires the pgvector extension).
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// OpenAI API key; not needed with --offline.
    #[arg(long, env = "OPENAI_API_KEY", default_value = "")]
    openai_api_key: String,

    /// Embedding model identifier.
    #[arg(long, default_value = DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,

    /// Embedding vector dimension; must match the model.
    #[arg(long, default_value_t = DEFAULT_EMBEDDING_DIMENSIONS)]
    dimensions: usize,

    /// Use the deterministic hashing embedder instead of the OpenAI API.
    #[arg(long, default_value_t = false)]
    offline: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest newline-delimited JSON news records into the vector store.
    Ingest {
        /// Path to a .jsonl file with title/content/published_at records.
        #[arg(long)]
        file: String,
    },
    /// Run diversified retrieval for a stock and print ranked candidates.
    Retrieve {
        /// Stock identifier (ticker or listing code).
        #[arg(long)]
        stock_code: String,
        #[arg(long)]
        company_name: Option<String>,
        #[arg(long)]
        industry: Option<String>,
        #[arg(long)]
        sector: Option<String>,
        #[arg(long)]
        business_summary: Option<String>,
        /// Maximum number of candidates to return.
        #[arg(long, default_value = "50")]
        cap: usize,
        /// Only consider news published before this RFC 3339 timestamp.
        #[arg(long)]
        before: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct RawNewsRecord {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default, alias = "time")]
    published_at: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

fn parse_published_at(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Stable across re-runs of the same feed file.
fn document_id_for(record: &RawNewsRecord) -> Uuid {
    let seed = format!(
        "{}\n{}",
        record.title,
        record.published_at.as_deref().unwrap_or_default()
    );
    Uuid::new_v5(&Uuid::NAMESPACE_OID, seed.as_bytes())
}

fn load_documents(path: &str) -> anyhow::Result<Vec<NewsDocument>> {
    let raw = std::fs::read_to_string(path)?;
    let mut documents = Vec::new();

    for (line_number, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let record: RawNewsRecord = match serde_json::from_str(line) {
            Ok(record) => record,
            Err(error) => {
                warn!(line = line_number + 1, %error, "skipping malformed news record");
                continue;
            }
        };

        if record.content.trim().is_empty() {
            warn!(line = line_number + 1, "skipping record without content");
            continue;
        }

        let Some(published_at) = record.published_at.as_deref().and_then(parse_published_at)
        else {
            warn!(line = line_number + 1, "skipping record without a usable timestamp");
            continue;
        };

        documents.push(NewsDocument {
            document_id: document_id_for(&record),
            title: record.title.clone(),
            body: record.content.clone(),
            published_at,
            source_url: record.url.clone(),
        });
    }

    Ok(documents)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let embedder: Box<dyn Embedder> = if cli.offline {
        Box::new(HashedNgramEmbedder::new(cli.dimensions))
    } else {
        if cli.openai_api_key.is_empty() {
            anyhow::bail!("OPENAI_API_KEY is required unless --offline is set");
        }
        Box::new(
            OpenAiEmbedder::new(cli.openai_api_key.clone())
                .with_model(cli.embedding_model.clone(), cli.dimensions),
        )
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&cli.database_url)
        .await?;
    let store = PgVectorStore::new(pool, embedder.dimensions(), embedder.model().to_string());
    store.ensure_schema().await?;

    info!(
        model = embedder.model(),
        dimensions = embedder.dimensions(),
        "news-rag boot"
    );

    match cli.command {
        Command::Ingest { file } => {
            let documents = load_documents(&file)?;
            info!(file = %file, documents = documents.len(), "ingesting documents");

            let pipeline = IngestionPipeline::new(store, embedder, IngestionOptions::default())
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            let report = pipeline.ingest_all(&documents).await;

            for skipped in &report.skipped {
                warn!(document_id = %skipped.document_id, reason = %skipped.reason, "document skipped");
            }

            println!(
                "{} documents ingested ({} chunks embedded, {} already present, {} chunks failed, {} documents skipped)",
                report.documents_ingested,
                report.stats.chunks_embedded,
                report.stats.chunks_skipped_existing,
                report.stats.chunks_failed,
                report.skipped.len()
            );
        }
        Command::Retrieve {
            stock_code,
            company_name,
            industry,
            sector,
            business_summary,
            cap,
            before,
        } => {
            let published_before = match before.as_deref() {
                Some(raw) => Some(
                    DateTime::parse_from_rfc3339(raw)
                        .map_err(|error| anyhow::anyhow!("invalid --before value: {error}"))?
                        .with_timezone(&Utc),
                ),
                None => None,
            };

            let has_profile = company_name.is_some()
                || industry.is_some()
                || sector.is_some()
                || business_summary.is_some();
            let profile = has_profile.then(|| StockProfile {
                company_name,
                industry,
                sector,
                business_summary,
            });

            let coordinator = RetrievalCoordinator::new(store, embedder).with_config(
                RetrievalConfig {
                    overall_cap: cap,
                    ..RetrievalConfig::default()
                },
            );

            let outcome = coordinator
                .retrieve(&stock_code, profile.as_ref(), published_before)
                .await?;

            println!(
                "stock: {} candidates: {} (variants run: {}, failed: {})",
                stock_code,
                outcome.candidates.len(),
                outcome.variants_run,
                outcome.variants_failed
            );

            for candidate in &outcome.candidates {
                println!(
                    "[{}] score={:.4} published={} chunk={}",
                    candidate.kind.as_str(),
                    candidate.similarity,
                    candidate.published_at.to_rfc3339(),
                    candidate.chunk_id
                );
                println!("  title: {}", candidate.title);
                println!("  text: {}", candidate.text);
            }

            if outcome.degraded {
                for diagnostic in &outcome.diagnostics {
                    println!("note: {diagnostic}");
                }
            }

            if outcome.candidates.is_empty() {
                println!("no relevant news context found");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{document_id_for, load_documents, parse_published_at, RawNewsRecord};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn parses_both_timestamp_formats() {
        assert!(parse_published_at("2023-05-02T09:30:00+09:00").is_some());
        assert!(parse_published_at("2023-05-02 09:30:00").is_some());
        assert!(parse_published_at("yesterday").is_none());
    }

    #[test]
    fn document_ids_are_stable_across_runs() {
        let record = RawNewsRecord {
            title: "Acme beats estimates".to_string(),
            content: "body".to_string(),
            published_at: Some("2023-05-02 09:30:00".to_string()),
            url: None,
        };
        assert_eq!(document_id_for(&record), document_id_for(&record));
    }

    #[test]
    fn malformed_and_empty_lines_are_skipped() -> anyhow::Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(
            file,
            r#"{{"title":"Acme up","content":"Shares rallied.","published_at":"2023-05-02 09:30:00"}}"#
        )?;
        writeln!(file, "not json at all")?;
        writeln!(file)?;
        writeln!(
            file,
            r#"{{"title":"No body","content":"","published_at":"2023-05-02 09:30:00"}}"#
        )?;
        writeln!(
            file,
            r#"{{"title":"No time","content":"text here"}}"#
        )?;

        let documents = load_documents(file.path().to_str().unwrap())?;
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].title, "Acme up");
        Ok(())
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsDocument {
    pub document_id: Uuid,
    pub title: String,
    pub body: String,
    pub published_at: DateTime<Utc>,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsChunk {
    pub chunk_id: String,
    pub document_id: Uuid,
    pub chunk_index: u32,
    pub title: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub embedding_model: String,
    pub published_at: DateTime<Utc>,
}

/// Declaration order is priority order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum VariantKind {
    StockCode,
    CompanyName,
    CompanyKeyword,
    Industry,
    Sector,
    BusinessKeyword,
    AnalysisKeyword,
}

impl VariantKind {
    pub fn priority(self) -> u8 {
        match self {
            VariantKind::StockCode => 0,
            VariantKind::CompanyName => 1,
            VariantKind::CompanyKeyword => 2,
            VariantKind::Industry => 3,
            VariantKind::Sector => 4,
            VariantKind::BusinessKeyword => 5,
            VariantKind::AnalysisKeyword => 6,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VariantKind::StockCode => "stock_code",
            VariantKind::CompanyName => "company_name",
            VariantKind::CompanyKeyword => "company_keyword",
            VariantKind::Industry => "industry",
            VariantKind::Sector => "sector",
            VariantKind::BusinessKeyword => "business_keyword",
            VariantKind::AnalysisKeyword => "analysis_keyword",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryVariant {
    pub query: String,
    pub kind: VariantKind,
    pub top_k: usize,
    pub threshold: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockProfile {
    pub company_name: Option<String>,
    pub industry: Option<String>,
    pub sector: Option<String>,
    pub business_summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk_id: String,
    pub title: String,
    pub text: String,
    pub published_at: DateTime<Utc>,
    pub similarity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalCandidate {
    pub chunk_id: String,
    pub title: String,
    pub text: String,
    pub published_at: DateTime<Utc>,
    pub similarity: f64,
    pub kind: VariantKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalOutcome {
    pub candidates: Vec<RetrievalCandidate>,
    pub variants_run: usize,
    pub variants_failed: usize,
    pub degraded: bool,
    pub diagnostics: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SearchParams {
    pub threshold: f64,
    pub limit: usize,
    pub published_before: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::VariantKind;

    #[test]
    fn variant_priority_follows_declaration_order() {
        let kinds = [
            VariantKind::StockCode,
            VariantKind::CompanyName,
            VariantKind::CompanyKeyword,
            VariantKind::Industry,
            VariantKind::Sector,
            VariantKind::BusinessKeyword,
            VariantKind::AnalysisKeyword,
        ];
        for pair in kinds.windows(2) {
            assert!(pair[0].priority() < pair[1].priority());
        }
    }
}

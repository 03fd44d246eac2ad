use crate::models::{QueryVariant, StockProfile, VariantKind};

#[derive(Debug, Clone, Copy)]
pub struct VariantBudget {
    pub top_k: usize,
    pub threshold: f64,
}

#[derive(Debug, Clone)]
pub struct ExpansionConfig {
    pub stock_code: VariantBudget,
    pub company_name: VariantBudget,
    pub company_keyword: VariantBudget,
    pub industry: VariantBudget,
    pub sector: VariantBudget,
    pub business_keyword: VariantBudget,
    pub analysis_keyword: VariantBudget,
    pub max_business_keywords: usize,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            stock_code: VariantBudget { top_k: 15, threshold: 0.5 },
            company_name: VariantBudget { top_k: 12, threshold: 0.4 },
            company_keyword: VariantBudget { top_k: 8, threshold: 0.3 },
            industry: VariantBudget { top_k: 8, threshold: 0.25 },
            sector: VariantBudget { top_k: 8, threshold: 0.25 },
            business_keyword: VariantBudget { top_k: 6, threshold: 0.25 },
            analysis_keyword: VariantBudget { top_k: 5, threshold: 0.3 },
            max_business_keywords: 2,
        }
    }
}

const COMPANY_KEYWORDS: [&str; 4] = ["earnings", "outlook", "investment", "share price"];

const ANALYSIS_KEYWORDS: [&str; 2] = ["analysis", "report"];

// Matched case-insensitively as substrings of the business summary.
const BUSINESS_TERMS: [&str; 38] = [
    "semiconductor",
    "memory",
    "display",
    "smartphone",
    "electronics",
    "software",
    "bio",
    "pharmaceutical",
    "chemical",
    "petroleum",
    "automotive",
    "shipbuilding",
    "construction",
    "finance",
    "banking",
    "securities",
    "insurance",
    "telecom",
    "game",
    "entertainment",
    "retail",
    "food",
    "beverage",
    "apparel",
    "cosmetics",
    "airline",
    "logistics",
    "energy",
    "artificial intelligence",
    "big data",
    "cloud",
    "5g",
    "iot",
    "blockchain",
    "technology",
    "hardware",
    "biotech",
    "defense",
];

const MAX_EXTRACTED_TERMS: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct QueryExpander {
    config: ExpansionConfig,
}

impl QueryExpander {
    pub fn new(config: ExpansionConfig) -> Self {
        Self { config }
    }

    pub fn expand(&self, stock_code: &str, profile: Option<&StockProfile>) -> Vec<QueryVariant> {
        let mut variants = Vec::new();

        variants.push(self.variant(
            stock_code.to_string(),
            VariantKind::StockCode,
            self.config.stock_code,
        ));

        if let Some(profile) = profile {
            if let Some(company) = profile.company_name.as_deref() {
                variants.push(self.variant(
                    company.to_string(),
                    VariantKind::CompanyName,
                    self.config.company_name,
                ));

                for keyword in COMPANY_KEYWORDS {
                    variants.push(self.variant(
                        format!("{company} {keyword}"),
                        VariantKind::CompanyKeyword,
                        self.config.company_keyword,
                    ));
                }
            }

            if let Some(industry) = profile.industry.as_deref() {
                variants.push(self.variant(
                    format!("{industry} industry"),
                    VariantKind::Industry,
                    self.config.industry,
                ));
            }

            if let Some(sector) = profile.sector.as_deref() {
                variants.push(self.variant(
                    format!("{sector} sector"),
                    VariantKind::Sector,
                    self.config.sector,
                ));
            }

            if let Some(summary) = profile.business_summary.as_deref() {
                for term in extract_business_keywords(summary)
                    .into_iter()
                    .take(self.config.max_business_keywords)
                {
                    variants.push(self.variant(
                        term.to_string(),
                        VariantKind::BusinessKeyword,
                        self.config.business_keyword,
                    ));
                }
            }
        }

        for keyword in ANALYSIS_KEYWORDS {
            variants.push(self.variant(
                format!("{stock_code} {keyword}"),
                VariantKind::AnalysisKeyword,
                self.config.analysis_keyword,
            ));
        }

        variants
    }

    fn variant(&self, query: String, kind: VariantKind, budget: VariantBudget) -> QueryVariant {
        QueryVariant {
            query,
            kind,
            top_k: budget.top_k,
            threshold: budget.threshold,
        }
    }
}

pub fn extract_business_keywords(business_summary: &str) -> Vec<&'static str> {
    let lowered = business_summary.to_lowercase();
    BUSINESS_TERMS
        .iter()
        .filter(|term| lowered.contains(&term.to_lowercase()))
        .take(MAX_EXTRACTED_TERMS)
        .copied()
        .collect()
}

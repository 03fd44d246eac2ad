use crate::error::EmbedError;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Inputs are truncated to this many characters before the provider call.
pub const MAX_INPUT_CHARS: usize = 8_000;

#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;
    fn model(&self) -> &str;
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

#[async_trait]
impl Embedder for Box<dyn Embedder> {
    fn dimensions(&self) -> usize {
        self.as_ref().dimensions()
    }

    fn model(&self) -> &str {
        self.as_ref().model()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        self.as_ref().embed(text).await
    }
}

pub fn truncate_input(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

pub struct OpenAiEmbedder {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
    max_input_chars: usize,
    retry: RetryPolicy,
}

impl OpenAiEmbedder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            max_input_chars: MAX_INPUT_CHARS,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.model = model.into();
        self.dimensions = dimensions;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn request_embedding(&self, input: &str) -> Result<Vec<f32>, EmbedError> {
        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "input": [input],
            }))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(EmbedError::RateLimited(format!(
                "provider returned {status}"
            )));
        }
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY {
            return Err(EmbedError::Rejected(format!("provider returned {status}")));
        }
        if !status.is_success() {
            return Err(EmbedError::Permanent(format!("provider returned {status}")));
        }

        let body: Value = response.json().await?;
        let vector = body
            .pointer("/data/0/embedding")
            .and_then(Value::as_array)
            .ok_or_else(|| EmbedError::Permanent("response missing embedding".to_string()))?
            .iter()
            .map(|value| value.as_f64().unwrap_or(0.0) as f32)
            .collect::<Vec<f32>>();

        Ok(vector)
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        if text.trim().is_empty() {
            return Err(EmbedError::EmptyInput);
        }

        let input = truncate_input(text, self.max_input_chars);
        let vector = self
            .retry
            .run(|| self.request_embedding(input), EmbedError::is_retryable)
            .await?;

        if vector.len() != self.dimensions {
            return Err(EmbedError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }

        Ok(vector)
    }
}

/// Deterministic character-trigram hashing embedder; not comparable to
/// provider embeddings.
#[derive(Debug, Clone)]
pub struct HashedNgramEmbedder {
    dimensions: usize,
}

impl HashedNgramEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn hash_vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

impl Default for HashedNgramEmbedder {
    fn default() -> Self {
        Self::new(128)
    }
}

#[async_trait]
impl Embedder for HashedNgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        "hashed-ngram-v1"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        if text.trim().is_empty() {
            return Err(EmbedError::EmptyInput);
        }
        Ok(self.hash_vector(text))
    }
}

#[cfg(test)]
mod tests {
    use super::{truncate_input, Embedder, HashedNgramEmbedder, OpenAiEmbedder};
    use crate::error::EmbedError;

    #[tokio::test]
    async fn hashed_embedder_is_deterministic() {
        let embedder = HashedNgramEmbedder::default();
        let first = embedder.embed("Samsung Electronics earnings beat").await.unwrap();
        let second = embedder.embed("Samsung Electronics earnings beat").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn hashed_embedder_outputs_expected_length() {
        let embedder = HashedNgramEmbedder::new(32);
        let vector = embedder.embed("abc").await.unwrap();
        assert_eq!(vector.len(), 32);
    }

    #[tokio::test]
    async fn empty_input_is_rejected_before_any_call() {
        let embedder = HashedNgramEmbedder::default();
        assert!(matches!(
            embedder.embed("   \n\t").await,
            Err(EmbedError::EmptyInput)
        ));

        // The provider client rejects it the same way, with no network call.
        let client = OpenAiEmbedder::new("test-key");
        assert!(matches!(
            client.embed("").await,
            Err(EmbedError::EmptyInput)
        ));
    }

    #[test]
    fn truncation_is_deterministic_and_char_safe() {
        assert_eq!(truncate_input("abcdef", 4), "abcd");
        assert_eq!(truncate_input("abc", 4), "abc");
        // Multi-byte boundary
        assert_eq!(truncate_input("héllo", 2), "hé");
    }
}

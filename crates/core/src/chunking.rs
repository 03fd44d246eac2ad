use crate::error::IngestError;
use regex::Regex;

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub max_tokens: usize,
    pub overlap_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: 500,
            overlap_tokens: 200,
        }
    }
}

/// Tokens are whitespace-delimited runs located by byte span, so every
/// window is a verbatim slice of the source text.
#[derive(Debug, Clone)]
pub struct TokenChunker {
    config: ChunkingConfig,
    token_pattern: Regex,
}

impl TokenChunker {
    pub fn new(config: ChunkingConfig) -> Result<Self, IngestError> {
        if config.max_tokens == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "max_tokens must be positive".to_string(),
            ));
        }
        if config.overlap_tokens >= config.max_tokens {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap_tokens {} must be smaller than max_tokens {}",
                config.overlap_tokens, config.max_tokens
            )));
        }

        Ok(Self {
            config,
            token_pattern: Regex::new(r"\S+").map_err(|error| {
                IngestError::InvalidChunkConfig(error.to_string())
            })?,
        })
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    pub fn token_count(&self, text: &str) -> usize {
        self.token_pattern.find_iter(text).count()
    }

    /// Text of at most `max_tokens` tokens comes back as a single unchanged
    /// chunk; longer text is windowed at stride `max_tokens - overlap_tokens`
    /// with the final window anchored at the last token.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let spans: Vec<(usize, usize)> = self
            .token_pattern
            .find_iter(text)
            .map(|token| (token.start(), token.end()))
            .collect();

        let total = spans.len();
        let window = self.config.max_tokens;

        if total <= window {
            return vec![text.to_string()];
        }

        let stride = window - self.config.overlap_tokens;
        let mut starts = Vec::new();
        let mut cursor = 0;
        while cursor + window < total {
            starts.push(cursor);
            cursor += stride;
        }
        starts.push(total - window);

        starts
            .into_iter()
            .map(|start| {
                let end = start + window;
                text[spans[start].0..spans[end - 1].1].to_string()
            })
            .collect()
    }
}

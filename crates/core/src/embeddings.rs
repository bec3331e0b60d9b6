use crate::error::EmbedError;
use crate::traits::{ensure_non_empty, Embedder};
use async_trait::async_trait;
use std::sync::OnceLock;

const DEFAULT: usize = 128;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;

/// Offline embedder hashing lowercase character trigrams into buckets.
#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl CharacterNgramEmbedder {
    pub fn dimensions(&self) -> usize {
        self.dimensions.max(1)
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions()];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

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

#[async_trait]
impl Embedder for CharacterNgramEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        texts
            .iter()
            .map(|text| {
                ensure_non_empty(text)?;
                Ok(self.embed_text(text))
            })
            .collect()
    }
}

/// Remembers the dimension of the first batch an embedder produced and
/// rejects any later batch that disagrees.
#[derive(Debug, Default)]
pub struct DimensionGuard {
    locked: OnceLock<usize>,
}

impl DimensionGuard {
    pub fn dimension(&self) -> Option<usize> {
        self.locked.get().copied()
    }

    pub fn check(&self, vectors: &[Vec<f32>]) -> Result<(), EmbedError> {
        let Some(first) = vectors.first() else {
            return Ok(());
        };
        if first.is_empty() {
            return Err(EmbedError::BackendResponse {
                backend: "embedder".to_string(),
                details: "received a zero-length vector".to_string(),
            });
        }

        let expected = *self.locked.get_or_init(|| first.len());
        match vectors.iter().find(|vector| vector.len() != expected) {
            Some(vector) => Err(EmbedError::DimensionMismatch {
                expected,
                found: vector.len(),
            }),
            None => Ok(()),
        }
    }
}

use crate::error::{EmbedError, GenerationError};
use async_trait::async_trait;

/// Turns text into dense vectors. Local encoders and remote APIs both sit
/// behind this one seam; nothing else in the pipeline knows which is used.
///
/// Every vector returned by one instance has the same dimension.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        ensure_non_empty(text)?;
        let mut vectors = self.embed(&[text.to_string()]).await?;
        match (vectors.pop(), vectors.is_empty()) {
            (Some(vector), true) => Ok(vector),
            _ => Err(EmbedError::BackendResponse {
                backend: "embedder".to_string(),
                details: "expected exactly one vector for a single input".to_string(),
            }),
        }
    }
}

/// A single call that turns a finished prompt into generated prose.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

pub(crate) fn ensure_non_empty(text: &str) -> Result<(), EmbedError> {
    if text.trim().is_empty() {
        return Err(EmbedError::InvalidInput(
            "text to embed must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl<T: Embedder + ?Sized> Embedder for Box<T> {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        (**self).embed(texts).await
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        (**self).embed_one(text).await
    }
}

#[async_trait]
impl<T: Generator + ?Sized> Generator for Box<T> {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        (**self).generate(prompt).await
    }
}

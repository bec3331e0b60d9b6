use crate::error::IngestError;
use crate::models::{Document, IngestionOptions, PolicyChunk};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub window: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        IngestionOptions::default().into()
    }
}

impl From<IngestionOptions> for ChunkingConfig {
    fn from(value: IngestionOptions) -> Self {
        Self {
            window: value.window,
            overlap: value.overlap,
        }
    }
}

impl ChunkingConfig {
    pub fn new(window: usize, overlap: usize) -> Result<Self, IngestError> {
        let config = Self { window, overlap };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), IngestError> {
        if self.window <= self.overlap {
            return Err(IngestError::InvalidChunkConfig(format!(
                "window ({}) must be greater than overlap ({})",
                self.window, self.overlap
            )));
        }
        Ok(())
    }

    pub fn stride(&self) -> usize {
        self.window.saturating_sub(self.overlap)
    }
}

/// Splits `text` into overlapping windows of whitespace-delimited words.
///
/// Windows start at `0, stride, 2 * stride, ...` and stop once a window
/// reaches the final word, so a trailing window is never a pure subset of
/// the one before it. Every word lands in at least one chunk.
pub fn chunk_words(text: &str, config: ChunkingConfig) -> Vec<String> {
    let words = text.split_whitespace().collect::<Vec<_>>();
    let window = config.window.max(1);
    let stride = config.stride().max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let end = start.saturating_add(window).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start = start.saturating_add(stride);
    }

    chunks
}

pub fn build_chunks(
    document: &Document,
    config: ChunkingConfig,
) -> Result<Vec<PolicyChunk>, IngestError> {
    config.validate()?;

    Ok(chunk_words(&document.text, config)
        .into_iter()
        .enumerate()
        .map(|(chunk_sequence, text)| PolicyChunk {
            document_id: document.document_id.clone(),
            chunk_sequence,
            text,
        })
        .collect())
}

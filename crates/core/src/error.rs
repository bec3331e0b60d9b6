use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("no usable chunks found under {}; nothing was indexed", .0.display())]
    NoContent(PathBuf),

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbedError),

    #[error("index build failed: {0}")]
    Index(#[from] IndexError),

    #[error("ingestion task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("embedding dimension {found} does not match {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index not found: {reason}. Run `policy-rag ingest` first to build it.")]
    MissingIndex { reason: String },

    #[error("cannot build an index from zero vectors")]
    Empty,

    #[error("vector dimension {found} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("corrupt index artifact: {0}")]
    Corrupt(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IndexError {
    pub fn missing(reason: impl Into<String>) -> Self {
        Self::MissingIndex {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("query embedding failed: {0}")]
    Embedding(EmbedError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

impl From<EmbedError> for SearchError {
    fn from(error: EmbedError) -> Self {
        match error {
            EmbedError::InvalidInput(details) => SearchError::InvalidInput(details),
            other => SearchError::Embedding(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("malformed generation response: {0}")]
    MalformedResponse(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;

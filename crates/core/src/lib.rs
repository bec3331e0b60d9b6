pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod generation;
pub mod index;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod prompt;
pub mod providers;
pub mod retriever;
pub mod store;
pub mod traits;

pub use chunking::{build_chunks, chunk_words, ChunkingConfig};
pub use embeddings::{CharacterNgramEmbedder, DimensionGuard, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{EmbedError, GenerationError, IndexError, IngestError, SearchError};
pub use extractor::{extract_page_texts, load_document_text, DocumentKind, PageText, PdfExtractor};
pub use generation::{AnswerGenerator, DEGRADED_ANSWER};
pub use index::{FlatL2Index, SearchHits, ABSENT_POSITION};
pub use ingest::{build_index, collect_chunks, discover_documents};
pub use models::{
    Answer, BuildSummary, Document, IngestionOptions, IngestionReport, PolicyChunk, QueryResult,
    SkippedDocument,
};
pub use orchestrator::RagEngine;
pub use prompt::{compose_prompt, REFUSAL_ANSWER};
pub use providers::{GeminiConfig, GeminiEmbedder, GeminiGenerator};
pub use retriever::{Retriever, DEFAULT_TOP_K};
pub use store::{IndexStore, LoadedIndex, DEFAULT_INDEX_DIR};
pub use traits::{Embedder, Generator};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw text of one source file, alive only while ingesting.
#[derive(Debug, Clone)]
pub struct Document {
    pub document_id: String,
    pub text: String,
}

/// Metadata record stored at the same position as its vector row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyChunk {
    #[serde(rename = "doc")]
    pub document_id: String,
    #[serde(rename = "chunk_id")]
    pub chunk_sequence: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub rank: usize,
    /// Squared Euclidean distance; lower is more similar.
    pub score: f32,
    #[serde(rename = "doc")]
    pub document_id: String,
    #[serde(rename = "chunk_id")]
    pub chunk_sequence: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<QueryResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionOptions {
    pub window: usize,
    pub overlap: usize,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            window: 400,
            overlap: 50,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SkippedDocument {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct IngestionReport {
    pub chunks: Vec<PolicyChunk>,
    pub indexed_documents: Vec<String>,
    pub skipped_files: Vec<SkippedDocument>,
}

#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub indexed_documents: Vec<String>,
    pub skipped_files: Vec<SkippedDocument>,
    pub chunk_count: usize,
    pub dimension: usize,
    pub index_path: PathBuf,
    pub metadata_path: PathBuf,
}

use crate::chunking::{build_chunks, ChunkingConfig};
use crate::error::{EmbedError, IngestError};
use crate::extractor::{load_document_text, DocumentKind};
use crate::index::FlatL2Index;
use crate::models::{
    BuildSummary, Document, IngestionOptions, IngestionReport, PolicyChunk, SkippedDocument,
};
use crate::store::{IndexStore, LoadedIndex};
use crate::traits::Embedder;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub fn discover_documents(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        if DocumentKind::from_path(entry.path()).is_some() {
            files.push(entry.path().to_path_buf());
        } else {
            debug!(path = %entry.path().display(), "unsupported extension, skipping");
        }
    }

    files.sort_unstable();
    files
}

/// Identifier of a document: its path relative to the source folder, with
/// `/` separators. Top-level files are identified by their file name.
pub fn document_id(folder: &Path, path: &Path) -> Result<String, IngestError> {
    let relative = path.strip_prefix(folder).unwrap_or(path);
    let parts = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>();

    if parts.is_empty() || path.file_name().is_none() {
        return Err(IngestError::MissingFileName(format!(
            "path missing filename: {}",
            path.display()
        )));
    }

    Ok(parts.join("/"))
}

/// Reads and chunks every supported document under `folder`. Documents
/// that cannot be read or hold no text are reported as skipped.
pub fn collect_chunks(
    folder: &Path,
    options: IngestionOptions,
) -> Result<IngestionReport, IngestError> {
    let config = ChunkingConfig::from(options);
    config.validate()?;

    if !folder.is_dir() {
        return Err(IngestError::InvalidArgument(format!(
            "source folder not found: {}",
            folder.display()
        )));
    }

    let mut chunks = Vec::new();
    let mut indexed_documents = Vec::new();
    let mut skipped_files = Vec::new();

    for path in discover_documents(folder) {
        let build_result = (|| -> Result<Option<(String, Vec<PolicyChunk>)>, IngestError> {
            let document_id = document_id(folder, &path)?;
            let text = load_document_text(&path)?.unwrap_or_default();
            if text.trim().is_empty() {
                return Ok(None);
            }

            let document = Document { document_id, text };
            build_chunks(&document, config).map(|chunks| Some((document.document_id, chunks)))
        })();

        match build_result {
            Ok(Some((document_id, document_chunks))) => {
                info!(
                    document = %document_id,
                    chunks = document_chunks.len(),
                    "processed document"
                );
                indexed_documents.push(document_id);
                chunks.extend(document_chunks);
            }
            Ok(None) => {
                warn!(path = %path.display(), "empty document skipped");
                skipped_files.push(SkippedDocument {
                    path,
                    reason: "document has no extractable text".to_string(),
                });
            }
            Err(error) => {
                warn!(path = %path.display(), reason = %error, "unreadable document skipped");
                skipped_files.push(SkippedDocument {
                    path,
                    reason: error.to_string(),
                });
            }
        }
    }

    Ok(IngestionReport {
        chunks,
        indexed_documents,
        skipped_files,
    })
}

/// Rebuilds the whole index from `source_dir` and persists it into `store`.
///
/// All chunks are embedded in a single batched call. When the corpus yields
/// no chunks nothing is written and any earlier artifacts stay in place.
pub async fn build_index<E>(
    source_dir: &Path,
    store: &IndexStore,
    embedder: &E,
    options: IngestionOptions,
) -> Result<BuildSummary, IngestError>
where
    E: Embedder + ?Sized,
{
    let folder = source_dir.to_path_buf();
    let report = tokio::task::spawn_blocking(move || collect_chunks(&folder, options)).await??;

    info!(
        documents = report.indexed_documents.len(),
        skipped = report.skipped_files.len(),
        chunks = report.chunks.len(),
        "collected chunks"
    );

    if report.chunks.is_empty() {
        return Err(IngestError::NoContent(source_dir.to_path_buf()));
    }

    let texts = report
        .chunks
        .iter()
        .map(|chunk| chunk.text.clone())
        .collect::<Vec<_>>();
    let vectors = embedder.embed(&texts).await?;
    ensure_one_vector_per_chunk(&report.chunks, &vectors)?;

    let index = FlatL2Index::build(&vectors)?;
    let dimension = index.dimension();
    info!(rows = index.len(), dimension, "built vector index");

    let loaded = LoadedIndex::new(index, report.chunks)?;
    store.save(&loaded)?;

    Ok(BuildSummary {
        indexed_documents: report.indexed_documents,
        skipped_files: report.skipped_files,
        chunk_count: loaded.len(),
        dimension,
        index_path: store.index_path(),
        metadata_path: store.metadata_path(),
    })
}

fn ensure_one_vector_per_chunk(
    chunks: &[PolicyChunk],
    vectors: &[Vec<f32>],
) -> Result<(), EmbedError> {
    if chunks.len() != vectors.len() {
        return Err(EmbedError::BackendResponse {
            backend: "embedder".to_string(),
            details: format!(
                "embedding count {} doesn't match chunk count {}",
                vectors.len(),
                chunks.len()
            ),
        });
    }
    Ok(())
}

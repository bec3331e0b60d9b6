use crate::error::IndexError;
use crate::index::FlatL2Index;
use crate::models::PolicyChunk;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};
use uuid::Uuid;

pub const DEFAULT_INDEX_DIR: &str = "models";
pub const INDEX_FILE_NAME: &str = "policy_index.json";
pub const METADATA_FILE_NAME: &str = "metadata.json";

#[derive(Debug, Serialize, Deserialize)]
struct IndexArtifact {
    build_id: Uuid,
    built_at: DateTime<Utc>,
    dimension: usize,
    count: usize,
    metadata_sha256: String,
    /// Row-major little-endian `f32` values, base64 encoded.
    vectors: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct MetadataArtifact {
    build_id: Uuid,
    records: Vec<PolicyChunk>,
}

/// A vector index together with its position-aligned metadata.
#[derive(Debug, Clone)]
pub struct LoadedIndex {
    pub index: FlatL2Index,
    pub metadata: Vec<PolicyChunk>,
    pub build_id: Uuid,
    pub built_at: DateTime<Utc>,
}

impl LoadedIndex {
    pub fn new(index: FlatL2Index, metadata: Vec<PolicyChunk>) -> Result<Self, IndexError> {
        if index.len() != metadata.len() {
            return Err(IndexError::Corrupt(format!(
                "{} vectors but {} metadata records",
                index.len(),
                metadata.len()
            )));
        }
        Ok(Self {
            index,
            metadata,
            build_id: Uuid::new_v4(),
            built_at: Utc::now(),
        })
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }
}

/// The two co-located artifacts of a built index.
#[derive(Debug, Clone)]
pub struct IndexStore {
    dir: PathBuf,
}

impl IndexStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE_NAME)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE_NAME)
    }

    pub fn exists(&self) -> bool {
        self.index_path().is_file() && self.metadata_path().is_file()
    }

    /// Writes both artifacts next to each other. Each file is written
    /// under a temporary name first and renamed into place, so an earlier
    /// build stays intact until the new one is fully on disk.
    pub fn save(&self, loaded: &LoadedIndex) -> Result<(), IndexError> {
        fs::create_dir_all(&self.dir)?;

        let metadata_bytes = serde_json::to_vec(&MetadataArtifact {
            build_id: loaded.build_id,
            records: loaded.metadata.clone(),
        })?;

        let vector_bytes = loaded
            .index
            .raw_rows()
            .iter()
            .flat_map(|value| value.to_le_bytes())
            .collect::<Vec<u8>>();

        let index_bytes = serde_json::to_vec(&IndexArtifact {
            build_id: loaded.build_id,
            built_at: loaded.built_at,
            dimension: loaded.index.dimension(),
            count: loaded.index.len(),
            metadata_sha256: sha256_hex(&metadata_bytes),
            vectors: STANDARD.encode(vector_bytes),
        })?;

        let metadata_tmp = self.dir.join(format!("{METADATA_FILE_NAME}.tmp"));
        let index_tmp = self.dir.join(format!("{INDEX_FILE_NAME}.tmp"));
        fs::write(&metadata_tmp, &metadata_bytes)?;
        fs::write(&index_tmp, &index_bytes)?;
        fs::rename(&metadata_tmp, self.metadata_path())?;
        fs::rename(&index_tmp, self.index_path())?;

        info!(
            build_id = %loaded.build_id,
            rows = loaded.len(),
            index = %self.index_path().display(),
            metadata = %self.metadata_path().display(),
            "saved index artifacts"
        );
        Ok(())
    }

    pub fn load(&self) -> Result<LoadedIndex, IndexError> {
        let index_path = self.index_path();
        let metadata_path = self.metadata_path();

        for path in [&index_path, &metadata_path] {
            if !path.is_file() {
                return Err(IndexError::missing(format!(
                    "{} does not exist",
                    path.display()
                )));
            }
        }

        let index_artifact: IndexArtifact = serde_json::from_slice(&fs::read(&index_path)?)?;
        let metadata_bytes = fs::read(&metadata_path)?;
        let metadata_artifact: MetadataArtifact = serde_json::from_slice(&metadata_bytes)?;

        if index_artifact.build_id != metadata_artifact.build_id {
            return Err(IndexError::missing(format!(
                "index build {} does not match metadata build {}",
                index_artifact.build_id, metadata_artifact.build_id
            )));
        }
        if index_artifact.metadata_sha256 != sha256_hex(&metadata_bytes) {
            return Err(IndexError::missing(
                "metadata checksum does not match the one recorded in the index",
            ));
        }
        if index_artifact.count != metadata_artifact.records.len() {
            return Err(IndexError::missing(format!(
                "index holds {} rows but metadata holds {} records",
                index_artifact.count,
                metadata_artifact.records.len()
            )));
        }

        let rows = decode_rows(&index_artifact)?;
        let index = FlatL2Index::from_raw(index_artifact.dimension, rows)?;

        debug!(
            build_id = %index_artifact.build_id,
            rows = index.len(),
            dimension = index.dimension(),
            "loaded index artifacts"
        );

        Ok(LoadedIndex {
            index,
            metadata: metadata_artifact.records,
            build_id: index_artifact.build_id,
            built_at: index_artifact.built_at,
        })
    }
}

fn decode_rows(artifact: &IndexArtifact) -> Result<Vec<f32>, IndexError> {
    let bytes = STANDARD
        .decode(artifact.vectors.as_bytes())
        .map_err(|error| IndexError::Corrupt(error.to_string()))?;

    let expected = artifact
        .count
        .checked_mul(artifact.dimension)
        .and_then(|floats| floats.checked_mul(4))
        .ok_or_else(|| IndexError::Corrupt("row count overflows".to_string()))?;
    if bytes.len() != expected {
        return Err(IndexError::Corrupt(format!(
            "expected {expected} vector bytes, found {}",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|raw| f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
        .collect())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> LoadedIndex {
        let vectors: Vec<Vec<f32>> = vec![
            vec![0.1, -0.2, 0.3],
            vec![1.5, 0.0, -7.25],
            vec![0.333_333, 2.0, 1e-7],
        ];
        let metadata = vectors
            .iter()
            .enumerate()
            .map(|(position, _)| PolicyChunk {
                document_id: "handbook.txt".to_string(),
                chunk_sequence: position,
                text: format!("chunk {position}"),
            })
            .collect();
        let index = FlatL2Index::build(&vectors).expect("valid vectors");
        LoadedIndex::new(index, metadata).expect("aligned metadata")
    }

    #[test]
    fn round_trip_preserves_search_results() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = IndexStore::new(dir.path());
        let original = sample();
        store.save(&original)?;

        let reloaded = store.load()?;
        assert_eq!(reloaded.index, original.index);
        assert_eq!(reloaded.metadata, original.metadata);
        assert_eq!(reloaded.build_id, original.build_id);

        for query in [[0.0f32, 0.0, 0.0], [1.0, -1.0, 0.5], [0.333_333, 2.0, 1e-7]] {
            assert_eq!(
                original.index.search(&query, 3)?,
                reloaded.index.search(&query, 3)?
            );
        }
        Ok(())
    }

    #[test]
    fn absent_artifacts_are_missing_index() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = IndexStore::new(dir.path());
        assert!(matches!(store.load(), Err(IndexError::MissingIndex { .. })));

        store.save(&sample())?;
        fs::remove_file(store.metadata_path())?;
        assert!(!store.exists());
        assert!(matches!(store.load(), Err(IndexError::MissingIndex { .. })));
        Ok(())
    }

    #[test]
    fn artifacts_from_different_builds_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let first_dir = tempdir()?;
        let second_dir = tempdir()?;
        let first = IndexStore::new(first_dir.path());
        let second = IndexStore::new(second_dir.path());
        first.save(&sample())?;
        second.save(&sample())?;

        fs::copy(second.metadata_path(), first.metadata_path())?;
        let error = first.load().expect_err("mixed pair must not load");
        assert!(matches!(error, IndexError::MissingIndex { .. }));
        assert!(error.to_string().contains("policy-rag ingest"));
        Ok(())
    }

    #[test]
    fn edited_metadata_fails_checksum() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = IndexStore::new(dir.path());
        store.save(&sample())?;

        let edited = fs::read_to_string(store.metadata_path())?.replace("chunk 1", "chunk X");
        fs::write(store.metadata_path(), edited)?;
        assert!(matches!(store.load(), Err(IndexError::MissingIndex { .. })));
        Ok(())
    }

    #[test]
    fn misaligned_metadata_is_refused() {
        let index = FlatL2Index::build(&[vec![0.0, 1.0]]).expect("valid vectors");
        assert!(LoadedIndex::new(index, Vec::new()).is_err());
    }
}

use crate::error::SearchError;
use crate::index::SearchHits;
use crate::models::{PolicyChunk, QueryResult};
use crate::store::LoadedIndex;
use crate::traits::Embedder;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_TOP_K: usize = 4;

/// Read-only query side of a built index.
pub struct Retriever<E> {
    embedder: E,
    index: Arc<LoadedIndex>,
}

impl<E> Retriever<E>
where
    E: Embedder,
{
    pub fn new(embedder: E, index: Arc<LoadedIndex>) -> Self {
        Self { embedder, index }
    }

    pub fn index(&self) -> &LoadedIndex {
        &self.index
    }

    /// Embeds `query` and returns up to `top_k` chunks, nearest first.
    /// Blank queries are rejected before the embedder is called.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<QueryResult>, SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::InvalidInput("query is empty".to_string()));
        }

        let query_vector = self.embedder.embed_one(query).await?;
        let hits = self.index.index.search(&query_vector, top_k)?;
        let results = map_hits(&hits, &self.index.metadata);

        debug!(top_k, hits = hits.len(), results = results.len(), "retrieved chunks");
        Ok(results)
    }
}

/// Pairs search hits with their metadata. Slots whose position is the
/// absent sentinel, or otherwise outside the metadata, are dropped; the
/// remaining results keep the rank of their slot in the search output.
pub fn map_hits(hits: &SearchHits, metadata: &[PolicyChunk]) -> Vec<QueryResult> {
    hits.iter()
        .enumerate()
        .filter_map(|(rank, (distance, position))| {
            let chunk = usize::try_from(position)
                .ok()
                .and_then(|position| metadata.get(position))?;

            Some(QueryResult {
                rank,
                score: distance,
                document_id: chunk.document_id.clone(),
                chunk_sequence: chunk.chunk_sequence,
                text: chunk.text.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::CharacterNgramEmbedder;
    use crate::error::EmbedError;
    use crate::index::{FlatL2Index, ABSENT_POSITION};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingEmbedder {
        inner: CharacterNgramEmbedder,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.embed(texts).await
        }
    }

    fn chunk(document_id: &str, chunk_sequence: usize, text: &str) -> PolicyChunk {
        PolicyChunk {
            document_id: document_id.to_string(),
            chunk_sequence,
            text: text.to_string(),
        }
    }

    fn corpus() -> Vec<PolicyChunk> {
        vec![
            chunk("leave.txt", 0, "Sick leave is 10 days per year."),
            chunk("travel.txt", 0, "Economy class is required for flights under six hours."),
            chunk("travel.txt", 1, "Hotel bookings need manager approval."),
        ]
    }

    async fn retriever_over(chunks: Vec<PolicyChunk>) -> Retriever<CountingEmbedder> {
        let embedder = CountingEmbedder::default();
        let texts = chunks.iter().map(|chunk| chunk.text.clone()).collect::<Vec<_>>();
        let vectors = embedder
            .inner
            .embed(&texts)
            .await
            .expect("embedding should succeed");
        let index = FlatL2Index::build(&vectors).expect("valid vectors");
        let loaded = LoadedIndex::new(index, chunks).expect("aligned metadata");
        Retriever::new(embedder, Arc::new(loaded))
    }

    #[tokio::test]
    async fn blank_queries_never_reach_the_embedder() {
        let retriever = retriever_over(corpus()).await;
        for query in ["", "   ", "\t\n"] {
            let error = retriever.retrieve(query, 4).await.expect_err("blank must fail");
            assert!(matches!(error, SearchError::InvalidInput(_)));
        }
        assert_eq!(retriever.embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exact_chunk_text_ranks_first_with_zero_score() {
        let retriever = retriever_over(corpus()).await;
        let results = retriever
            .retrieve("Hotel bookings need manager approval.", 2)
            .await
            .expect("retrieval should succeed");

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].rank, 0);
        assert_eq!(results[0].score, 0.0);
        assert_eq!(results[0].document_id, "travel.txt");
        assert_eq!(results[0].chunk_sequence, 1);
        assert_eq!(results[1].rank, 1);
        assert!(results[1].score >= results[0].score);
    }

    #[tokio::test]
    async fn top_k_beyond_corpus_returns_everything() {
        let retriever = retriever_over(corpus()).await;
        let results = retriever
            .retrieve("leave", 10)
            .await
            .expect("retrieval should succeed");
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn sentinel_and_out_of_range_positions_are_skipped() {
        let hits = SearchHits {
            distances: vec![0.5, 0.75, 1.0, 2.0],
            positions: vec![2, ABSENT_POSITION, 7, 0],
        };
        let results = map_hits(&hits, &corpus());

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].rank, 0);
        assert_eq!(results[0].chunk_sequence, 1);
        assert_eq!(results[0].score, 0.5);
        assert_eq!(results[1].rank, 3);
        assert_eq!(results[1].document_id, "leave.txt");
    }
}

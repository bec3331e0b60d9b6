use crate::error::{IndexError, SearchError};
use crate::generation::AnswerGenerator;
use crate::models::{Answer, QueryResult};
use crate::prompt::{compose_prompt, REFUSAL_ANSWER};
use crate::retriever::Retriever;
use crate::store::IndexStore;
use crate::traits::{Embedder, Generator};
use std::sync::Arc;
use tracing::info;

/// Query-time engine: retrieval, grounded prompt, generation.
///
/// Construct it once when the hosting process starts and share it by
/// reference; the loaded index is read-only for the engine's lifetime.
pub struct RagEngine<E, G> {
    retriever: Retriever<E>,
    generator: AnswerGenerator<G>,
    top_k: usize,
}

impl<E, G> RagEngine<E, G>
where
    E: Embedder,
    G: Generator,
{
    pub fn new(retriever: Retriever<E>, generator: G, top_k: usize) -> Self {
        Self {
            retriever,
            generator: AnswerGenerator::new(generator),
            top_k,
        }
    }

    /// Loads both index artifacts from `store`. Fails with
    /// [`IndexError::MissingIndex`] when they are absent or do not pair up.
    pub fn open(
        store: &IndexStore,
        embedder: E,
        generator: G,
        top_k: usize,
    ) -> Result<Self, IndexError> {
        let loaded = store.load()?;
        info!(
            build_id = %loaded.build_id,
            built_at = %loaded.built_at.to_rfc3339(),
            rows = loaded.len(),
            dimension = loaded.index.dimension(),
            "rag engine ready"
        );

        Ok(Self::new(
            Retriever::new(embedder, Arc::new(loaded)),
            generator,
            top_k,
        ))
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn retriever(&self) -> &Retriever<E> {
        &self.retriever
    }

    pub async fn retrieve(&self, question: &str) -> Result<Vec<QueryResult>, SearchError> {
        self.retriever.retrieve(question, self.top_k).await
    }

    /// Answers `question` from retrieved context only.
    ///
    /// With nothing retrieved the refusal string is returned without calling
    /// the generator. Generation failures never surface here; they turn into
    /// the degraded answer. Errors are limited to invalid input and
    /// retrieval failures.
    pub async fn generate_answer(&self, question: &str) -> Result<Answer, SearchError> {
        let sources = self.retrieve(question).await?;

        if sources.is_empty() {
            info!("no context retrieved, refusing");
            return Ok(Answer {
                answer: REFUSAL_ANSWER.to_string(),
                sources,
            });
        }

        let prompt = compose_prompt(question, &sources);
        let answer = self.generator.generate(&prompt).await;

        Ok(Answer { answer, sources })
    }
}

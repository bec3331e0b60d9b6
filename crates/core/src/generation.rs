use crate::error::GenerationError;
use crate::traits::Generator;
use tracing::error;

/// Returned in place of a model answer when the generation call fails.
/// Distinct from [`crate::prompt::REFUSAL_ANSWER`], which means "no grounding found".
pub const DEGRADED_ANSWER: &str = "Sorry, I encountered an error while processing your request.";

/// Wraps a [`Generator`] so that callers always get an answer string.
pub struct AnswerGenerator<G> {
    generator: G,
}

impl<G> AnswerGenerator<G>
where
    G: Generator,
{
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub async fn generate(&self, prompt: &str) -> String {
        match self.generator.generate(prompt).await {
            Ok(text) => text,
            Err(failure) => {
                log_failure(&failure);
                DEGRADED_ANSWER.to_string()
            }
        }
    }
}

fn log_failure(failure: &GenerationError) {
    match failure {
        GenerationError::MalformedResponse(details) => {
            error!(details = %details, "generation returned no usable text")
        }
        other => error!(error = %other, "generation call failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::REFUSAL_ANSWER;
    use async_trait::async_trait;

    struct FixedGenerator(&'static str);

    #[async_trait]
    impl Generator for FixedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl Generator for FailingGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            Err(GenerationError::BackendResponse {
                backend: "test".to_string(),
                details: "503 Service Unavailable".to_string(),
            })
        }
    }

    struct EmptyGenerator;

    #[async_trait]
    impl Generator for EmptyGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            Err(GenerationError::MalformedResponse("no candidates".to_string()))
        }
    }

    #[test]
    fn degraded_answer_differs_from_refusal() {
        assert_ne!(DEGRADED_ANSWER, REFUSAL_ANSWER);
    }

    #[tokio::test]
    async fn successful_generation_passes_through() {
        let generator = AnswerGenerator::new(FixedGenerator("Ten days."));
        assert_eq!(generator.generate("prompt").await, "Ten days.");
    }

    #[tokio::test]
    async fn failures_become_the_degraded_answer() {
        assert_eq!(
            AnswerGenerator::new(FailingGenerator).generate("prompt").await,
            DEGRADED_ANSWER
        );
        assert_eq!(
            AnswerGenerator::new(EmptyGenerator).generate("prompt").await,
            DEGRADED_ANSWER
        );
    }
}

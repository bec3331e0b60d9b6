use crate::embeddings::DimensionGuard;
use crate::error::{EmbedError, GenerationError};
use crate::traits::{ensure_non_empty, Embedder, Generator};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use url::Url;

pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_EMBED_MODEL: &str = "models/text-embedding-004";
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";

/// Upper bound the API accepts for one `batchEmbedContents` request.
const MAX_BATCH: usize = 100;

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub endpoint: String,
    pub api_key: String,
    pub embed_model: String,
    pub chat_model: String,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            api_key: api_key.into(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
        }
    }

    fn method_url(&self, model: &str, method: &str) -> Result<Url, url::ParseError> {
        let base = Url::parse(&format!("{}/", self.endpoint.trim_end_matches('/')))?;
        base.join(&format!("v1beta/{}:{method}", model_path(model)))
    }
}

fn model_path(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct SingleEmbedResponse {
    embedding: Option<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

pub struct GeminiEmbedder {
    config: GeminiConfig,
    client: Client,
    guard: DimensionGuard,
}

impl GeminiEmbedder {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            client: Client::new(),
            guard: DimensionGuard::default(),
        }
    }

    async fn post(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, EmbedError> {
        let url = self.config.method_url(&self.config.embed_model, method)?;
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(EmbedError::BackendResponse {
                backend: "gemini".to_string(),
                details: response.status().to_string(),
            });
        }
        Ok(response)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let model = model_path(&self.config.embed_model);
        let requests = texts
            .iter()
            .map(|text| {
                json!({
                    "model": model,
                    "content": { "parts": [{ "text": text }] },
                })
            })
            .collect::<Vec<_>>();

        let response = self
            .post("batchEmbedContents", json!({ "requests": requests }))
            .await?;
        let parsed: BatchEmbedResponse = response.json().await?;

        if parsed.embeddings.len() != texts.len() {
            return Err(EmbedError::BackendResponse {
                backend: "gemini".to_string(),
                details: format!(
                    "requested {} embeddings, received {}",
                    texts.len(),
                    parsed.embeddings.len()
                ),
            });
        }

        Ok(parsed
            .embeddings
            .into_iter()
            .map(|embedding| embedding.values)
            .collect())
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        for text in texts {
            ensure_non_empty(text)?;
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH) {
            let embedded = self.embed_batch(batch).await?;
            self.guard.check(&embedded)?;
            vectors.extend(embedded);
        }

        Ok(vectors)
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        ensure_non_empty(text)?;

        let response = self
            .post(
                "embedContent",
                json!({
                    "model": model_path(&self.config.embed_model),
                    "content": { "parts": [{ "text": text }] },
                }),
            )
            .await?;
        let parsed: SingleEmbedResponse = response.json().await?;

        let vector = parsed
            .embedding
            .map(|embedding| embedding.values)
            .ok_or_else(|| EmbedError::BackendResponse {
                backend: "gemini".to_string(),
                details: "response has no embedding".to_string(),
            })?;
        self.guard.check(std::slice::from_ref(&vector))?;
        Ok(vector)
    }
}

pub struct GeminiGenerator {
    config: GeminiConfig,
    client: Client,
}

impl GeminiGenerator {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = self
            .config
            .method_url(&self.config.chat_model, "generateContent")?;

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&json!({
                "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GenerationError::BackendResponse {
                backend: "gemini".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        candidate_text(parsed)
    }
}

fn candidate_text(response: GenerateResponse) -> Result<String, GenerationError> {
    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(GenerationError::MalformedResponse(
            "response has no candidate text".to_string(),
        ));
    }
    Ok(text)
}

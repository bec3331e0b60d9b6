use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use policy_rag_core::providers::gemini::{
    DEFAULT_CHAT_MODEL, DEFAULT_EMBED_MODEL, DEFAULT_GEMINI_ENDPOINT,
};
use policy_rag_core::{
    build_index, Answer, CharacterNgramEmbedder, Embedder, GeminiConfig, GeminiEmbedder,
    GeminiGenerator, IndexStore, IngestError, IngestionOptions, QueryResult, RagEngine, Retriever,
    SearchError, DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_INDEX_DIR, DEFAULT_TOP_K,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

type Engine = RagEngine<Box<dyn Embedder>, GeminiGenerator>;

#[derive(Parser)]
#[command(name = "policy-rag", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding the index and metadata artifacts
    #[arg(long, env = "POLICY_RAG_INDEX_DIR", default_value = DEFAULT_INDEX_DIR, global = true)]
    index_dir: PathBuf,

    /// Embedding backend; must match the one used at ingestion
    #[arg(
        long,
        env = "POLICY_RAG_EMBEDDER",
        value_enum,
        default_value_t = EmbedderKind::Gemini,
        global = true
    )]
    embedder: EmbedderKind,

    /// Vector size of the local trigram embedder
    #[arg(long, default_value_t = DEFAULT_EMBEDDING_DIMENSIONS, global = true)]
    ngram_dimensions: usize,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, global = true)]
    gemini_api_key: Option<String>,

    /// Gemini API base URL
    #[arg(long, env = "GEMINI_ENDPOINT", default_value = DEFAULT_GEMINI_ENDPOINT, global = true)]
    gemini_endpoint: String,

    /// Gemini embedding model
    #[arg(long, env = "GEMINI_EMBED_MODEL", default_value = DEFAULT_EMBED_MODEL, global = true)]
    embed_model: String,

    /// Gemini generation model
    #[arg(long, env = "GEMINI_CHAT_MODEL", default_value = DEFAULT_CHAT_MODEL, global = true)]
    chat_model: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EmbedderKind {
    /// Remote Gemini embedding API.
    Gemini,
    /// Local character-trigram hashing, no network.
    Ngram,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild the index from every .txt and .pdf file in a folder.
    Ingest {
        /// Folder that contains the policy documents.
        #[arg(long, default_value = "data/policies")]
        folder: PathBuf,
        /// Words per chunk.
        #[arg(long, default_value = "400")]
        window: usize,
        /// Words shared by consecutive chunks.
        #[arg(long, default_value = "50")]
        overlap: usize,
    },
    /// Answer one question from the indexed policies.
    Ask {
        /// Question to answer
        #[arg(long)]
        question: String,
        /// Number of chunks to retrieve as context.
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },
    /// Show the chunks nearest to a query without generating an answer.
    Search {
        /// Search query
        #[arg(long)]
        query: String,
        /// Number of chunks to return.
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },
    /// Interactive session; the index is loaded once and reused.
    Chat {
        /// Number of chunks to retrieve as context.
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },
}

impl Cli {
    fn gemini_config(&self) -> anyhow::Result<GeminiConfig> {
        let api_key = self
            .gemini_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .context("GEMINI_API_KEY not set. Export it or pass --gemini-api-key.")?;

        let mut config = GeminiConfig::new(api_key);
        config.endpoint = self.gemini_endpoint.clone();
        config.embed_model = self.embed_model.clone();
        config.chat_model = self.chat_model.clone();
        Ok(config)
    }

    fn build_embedder(&self) -> anyhow::Result<Box<dyn Embedder>> {
        Ok(match self.embedder {
            EmbedderKind::Gemini => Box::new(GeminiEmbedder::new(self.gemini_config()?)),
            EmbedderKind::Ngram => Box::new(CharacterNgramEmbedder {
                dimensions: self.ngram_dimensions,
            }),
        })
    }

    fn open_engine(&self, top_k: usize) -> anyhow::Result<Engine> {
        let generator = GeminiGenerator::new(self.gemini_config()?);
        let store = IndexStore::new(&self.index_dir);
        let engine = RagEngine::open(&store, self.build_embedder()?, generator, top_k)?;
        info!(
            chunks = engine.retriever().index().len(),
            top_k = engine.top_k(),
            "engine ready"
        );
        Ok(engine)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        index_dir = %cli.index_dir.display(),
        embedder = ?cli.embedder,
        "policy-rag boot"
    );

    if cli.gemini_api_key.is_none() {
        warn!("GEMINI_API_KEY not set; only local embedding and search are available");
    }

    match &cli.command {
        Command::Ingest {
            folder,
            window,
            overlap,
        } => {
            let options = IngestionOptions {
                window: *window,
                overlap: *overlap,
            };
            let embedder = cli.build_embedder()?;
            let store = IndexStore::new(&cli.index_dir);
            if store.exists() {
                info!(index_dir = %cli.index_dir.display(), "replacing existing index");
            }

            let summary = match build_index(folder, &store, &*embedder, options).await {
                Ok(summary) => summary,
                Err(IngestError::NoContent(folder)) => {
                    anyhow::bail!(
                        "no chunks found in {}; check that it holds readable .txt or .pdf files",
                        folder.display()
                    );
                }
                Err(error) => return Err(error.into()),
            };

            for skipped in &summary.skipped_files {
                println!("skipped {}: {}", skipped.path.display(), skipped.reason);
            }
            println!(
                "{} chunks from {} documents ingested at {} (dimension {})",
                summary.chunk_count,
                summary.indexed_documents.len(),
                Utc::now().to_rfc3339(),
                summary.dimension
            );
            println!("index: {}", summary.index_path.display());
            println!("metadata: {}", summary.metadata_path.display());
        }
        Command::Ask { question, top_k } => {
            let engine = cli.open_engine(*top_k)?;
            answer_question(&engine, question).await;
        }
        Command::Search { query, top_k } => {
            let store = IndexStore::new(&cli.index_dir);
            let loaded = store.load()?;
            let retriever = Retriever::new(cli.build_embedder()?, Arc::new(loaded));

            match retriever.retrieve(query, *top_k).await {
                Ok(results) if results.is_empty() => println!("no matching chunks"),
                Ok(results) => results.iter().for_each(print_source),
                Err(error) => println!("An error occurred: {error}"),
            }
        }
        Command::Chat { top_k } => {
            let engine = cli.open_engine(*top_k)?;
            chat(&engine).await?;
        }
    }

    Ok(())
}

async fn chat(engine: &Engine) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"\nYour question ('exit' to quit): ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }

        answer_question(engine, question).await;
    }

    Ok(())
}

/// Prints the answer and its sources. Failures are reported to the user
/// and never end the process.
async fn answer_question(engine: &Engine, question: &str) {
    match engine.generate_answer(question).await {
        Ok(answer) => print_answer(&answer),
        Err(SearchError::InvalidInput(_)) => println!("Please enter a question."),
        Err(error) => {
            warn!(error = %error, "answering failed");
            println!("An error occurred: {error}");
        }
    }
}

fn print_answer(answer: &Answer) {
    println!("Answer:\n{}\n", answer.answer);

    if answer.sources.is_empty() {
        println!("No specific sources were retrieved for this answer.");
        return;
    }

    println!("Sources:");
    answer.sources.iter().for_each(print_source);
}

fn print_source(source: &QueryResult) {
    println!(
        "[{}] Source: {} (Chunk: {})\nScore: {:.4}\n---\n{}\n",
        source.rank, source.document_id, source.chunk_sequence, source.score, source.text
    );
}

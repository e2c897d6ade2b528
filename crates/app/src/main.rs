mod error;
mod render;
mod routes;
mod storage;

use chrono::Utc;
use clap::{Parser, ValueEnum};
use pdf_chat_core::{
    CharacterNgramEmbedder, ChatService, ConversationOptions, DocumentPipeline, Embedder,
    HubConfig, HuggingFaceEmbedder, HuggingFaceHubModel, LopdfExtractor, SessionStore,
    DEFAULT_EMBEDDING_MODEL, DEFAULT_LLM_REPO,
};
use routes::{router, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use storage::LocalFileStorage;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EmbedderKind {
    /// Hosted feature-extraction endpoint.
    Hub,
    /// Local hashed character trigrams; no network needed.
    Ngram,
}

#[derive(Parser)]
#[command(name = "pdf-chat", version)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "PDFCHAT_BIND", default_value = "0.0.0.0:8000")]
    bind: SocketAddr,

    /// Directory where uploaded PDFs are stored
    #[arg(long, env = "PDFCHAT_UPLOAD_DIR", default_value = "uploads")]
    upload_dir: String,

    /// Base URL of the hosted inference API
    #[arg(long, env = "HUGGINGFACEHUB_API_URL", default_value = pdf_chat_core::hub::DEFAULT_INFERENCE_URL)]
    inference_url: String,

    /// API token for the inference API
    #[arg(long, env = "HUGGINGFACEHUB_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Embedding backend
    #[arg(long, env = "PDFCHAT_EMBEDDER", value_enum, default_value_t = EmbedderKind::Hub)]
    embedder: EmbedderKind,

    /// Sentence embedding model
    #[arg(long, env = "PDFCHAT_EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,

    /// Text generation model
    #[arg(long, env = "PDFCHAT_LLM_REPO", default_value = DEFAULT_LLM_REPO)]
    llm_repo: String,

    /// Sampling temperature
    #[arg(long, default_value_t = pdf_chat_core::DEFAULT_TEMPERATURE)]
    temperature: f32,

    /// Maximum generated length
    #[arg(long, default_value_t = pdf_chat_core::DEFAULT_MAX_LENGTH)]
    max_length: u32,

    /// Chunks retrieved per question
    #[arg(long, default_value_t = pdf_chat_core::DEFAULT_TOP_K)]
    top_k: usize,

    /// Skip rephrasing follow-up questions before retrieval
    #[arg(long, default_value_t = false)]
    no_condense: bool,

    /// Timeout for calls to the inference API, in seconds
    #[arg(long, default_value_t = pdf_chat_core::hub::DEFAULT_TIMEOUT_SECS)]
    request_timeout_secs: u64,

    /// Idle time before a session is dropped, in seconds
    #[arg(long, env = "PDFCHAT_SESSION_TTL_SECS", default_value_t = pdf_chat_core::DEFAULT_SESSION_TTL.as_secs())]
    session_ttl_secs: u64,

    /// Maximum request body size, in megabytes
    #[arg(long, default_value_t = 50)]
    max_upload_mb: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let hub = HubConfig {
        base_url: cli.inference_url.clone(),
        api_token: cli.api_token.clone(),
        timeout_secs: cli.request_timeout_secs,
    };

    let embedder: Arc<dyn Embedder> = match cli.embedder {
        EmbedderKind::Hub => Arc::new(HuggingFaceEmbedder::new(&hub, &cli.embedding_model)?),
        EmbedderKind::Ngram => Arc::new(CharacterNgramEmbedder::default()),
    };
    let model = HuggingFaceHubModel::new(&hub, &cli.llm_repo)?
        .with_temperature(cli.temperature)
        .with_max_length(cli.max_length);

    let pipeline = DocumentPipeline::new(Arc::new(LopdfExtractor), embedder, Arc::new(model))
        .with_conversation_options(ConversationOptions {
            top_k: cli.top_k,
            condense_question: !cli.no_condense,
        });
    let sessions = SessionStore::new(Duration::from_secs(cli.session_ttl_secs));

    let state = Arc::new(AppState {
        service: ChatService::new(pipeline, sessions),
        storage: Arc::new(LocalFileStorage::new(&cli.upload_dir)),
    });

    let app = router(state, cli.max_upload_mb * 1024 * 1024).layer(TraceLayer::new_for_http());

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        bind = %cli.bind,
        embedder = ?cli.embedder,
        llm_repo = %cli.llm_repo,
        upload_dir = %cli.upload_dir,
        "pdf-chat boot"
    );

    let listener = TcpListener::bind(cli.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("pdf-chat stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

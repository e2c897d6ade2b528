pub mod chunking;
pub mod conversation;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod hub;
pub mod index;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod service;
pub mod session;
pub mod traits;

pub use chunking::{split_text, ChunkingConfig};
pub use conversation::{ConversationChain, ConversationOptions};
pub use embeddings::{
    CharacterNgramEmbedder, Embedder, HuggingFaceEmbedder, DEFAULT_EMBEDDING_DIMENSIONS,
    DEFAULT_EMBEDDING_MODEL,
};
pub use error::{ChatError, IngestError, ServiceError};
pub use extractor::{extract_raw_text, LopdfExtractor, PdfExtractor};
pub use hub::{HubClient, HubConfig};
pub use index::{InMemoryVectorIndex, DEFAULT_TOP_K};
pub use llm::{HuggingFaceHubModel, DEFAULT_LLM_REPO, DEFAULT_MAX_LENGTH, DEFAULT_TEMPERATURE};
pub use models::{
    AskOutcome, ChatHistory, ChatTurn, RetrievedChunk, TextChunk, UploadSummary, UploadedDocument,
};
pub use pipeline::DocumentPipeline;
pub use service::{ChatRequest, ChatResponse, ChatService};
pub use session::{SessionId, SessionState, SessionStore, DEFAULT_SESSION_TTL};
pub use traits::{LanguageModel, Retriever};

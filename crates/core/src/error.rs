use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error in {file_name}: {details}")]
    PdfParse { file_name: String, details: String },

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("service request failed: {0}")]
    Request(String),
}

/// Failures surfaced by the chat pipeline. Each variant maps to one
/// user-facing message at the request boundary.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("could not read the uploaded pdf: {0}")]
    Parse(String),

    #[error("invalid chunk input: {0}")]
    Config(String),

    #[error("failed to build the search index: {0}")]
    IndexBuild(String),

    #[error("language model call failed: {0}")]
    Model(String),

    #[error("no active conversation: {0}")]
    State(String),
}

impl From<IngestError> for ChatError {
    fn from(value: IngestError) -> Self {
        match value {
            IngestError::InvalidChunkConfig(details) => ChatError::Config(details),
            other => ChatError::Parse(other.to_string()),
        }
    }
}

pub type Result<T, E = ChatError> = std::result::Result<T, E>;

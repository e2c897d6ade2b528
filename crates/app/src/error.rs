use axum::http::StatusCode;
use pdf_chat_core::ChatError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid form: {0}")]
    Form(String),

    #[error("upload exceeds the request size limit")]
    UploadTooLarge,

    #[error("file storage failed: {0}")]
    Storage(#[from] std::io::Error),

    #[error(transparent)]
    Chat(#[from] ChatError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Form(_) => StatusCode::BAD_REQUEST,
            AppError::UploadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Chat(ChatError::Parse(_)) | AppError::Chat(ChatError::Config(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Chat(ChatError::IndexBuild(_)) | AppError::Chat(ChatError::Model(_)) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Chat(ChatError::State(_)) => StatusCode::CONFLICT,
        }
    }

    /// Message shown on the page. Backend details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Form(details) => format!("Please check the form: {details}."),
            AppError::UploadTooLarge => {
                "The uploaded files are too large. Please upload fewer or smaller PDFs.".to_string()
            }
            AppError::Storage(_) => {
                "The uploaded files could not be stored. Please try again.".to_string()
            }
            AppError::Chat(ChatError::Parse(_)) => {
                "One of the uploaded files is not a readable PDF, so none of them were indexed."
                    .to_string()
            }
            AppError::Chat(ChatError::Config(_)) => {
                "No text could be extracted from the uploaded PDFs.".to_string()
            }
            AppError::Chat(ChatError::IndexBuild(_)) => {
                "The embedding service is unavailable, so the documents could not be indexed."
                    .to_string()
            }
            AppError::Chat(ChatError::Model(_)) => {
                "The language model could not answer right now. Please try again.".to_string()
            }
            AppError::Chat(ChatError::State(_)) => {
                "Upload at least one PDF before asking a question.".to_string()
            }
        }
    }
}

use crate::pipeline::DocumentPipeline;
use crate::session::{SessionId, SessionStore};
use crate::{ChatError, ChatHistory, UploadSummary, UploadedDocument};
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub documents: Vec<UploadedDocument>,
    pub question: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    pub uploaded: Option<UploadSummary>,
    pub answer: Option<String>,
    pub chat_history: Option<ChatHistory>,
}

/// Runs one form submission against a user's session: an optional upload
/// followed by an optional question.
pub struct ChatService {
    pipeline: DocumentPipeline,
    sessions: SessionStore,
}

impl ChatService {
    pub fn new(pipeline: DocumentPipeline, sessions: SessionStore) -> Self {
        Self { pipeline, sessions }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub async fn handle(
        &self,
        session_id: SessionId,
        request: ChatRequest,
    ) -> Result<ChatResponse, ChatError> {
        let question = request
            .question
            .map(|question| question.trim().to_string())
            .filter(|question| !question.is_empty());
        let has_upload = !request.documents.is_empty();

        let session = if has_upload {
            self.sessions.get_or_create(session_id).await
        } else if question.is_some() {
            self.sessions.get(session_id).await.ok_or_else(no_conversation)?
        } else {
            return Ok(ChatResponse::default());
        };

        let mut state = session.lock().await;
        let mut response = ChatResponse::default();

        if has_upload {
            let conversation = self.pipeline.build_conversation(&request.documents).await?;
            let summary = UploadSummary {
                documents: request.documents.len(),
                chunks: conversation.chunk_count(),
            };
            state.replace_conversation(conversation);
            info!(
                session = %session_id,
                documents = summary.documents,
                chunks = summary.chunks,
                "conversation replaced"
            );
            response.uploaded = Some(summary);
        }

        if let Some(question) = question {
            let conversation = state.conversation.as_mut().ok_or_else(no_conversation)?;
            let outcome = conversation.ask(&question).await?;
            state.chat_history = outcome.chat_history.clone();
            response.answer = Some(outcome.answer);
            response.chat_history = Some(outcome.chat_history);
        }

        Ok(response)
    }

    pub async fn chat_history(&self, session_id: SessionId) -> Option<ChatHistory> {
        let session = self.sessions.get(session_id).await?;
        let state = session.lock().await;
        Some(state.chat_history.clone())
    }
}

fn no_conversation() -> ChatError {
    ChatError::State("upload at least one PDF before asking a question".to_string())
}

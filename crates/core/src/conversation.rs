use crate::index::DEFAULT_TOP_K;
use crate::traits::{LanguageModel, Retriever};
use crate::{AskOutcome, ChatError, ChatHistory, RetrievedChunk};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversationOptions {
    pub top_k: usize,
    /// Rephrase follow-up questions into standalone ones before retrieval.
    pub condense_question: bool,
}

impl Default for ConversationOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            condense_question: true,
        }
    }
}

/// Question answering over one index, accumulating the chat history.
pub struct ConversationChain {
    retriever: Box<dyn Retriever>,
    model: Arc<dyn LanguageModel>,
    history: ChatHistory,
    options: ConversationOptions,
}

impl ConversationChain {
    pub fn new(
        retriever: Box<dyn Retriever>,
        model: Arc<dyn LanguageModel>,
        options: ConversationOptions,
    ) -> Self {
        Self {
            retriever,
            model,
            history: ChatHistory::default(),
            options,
        }
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    pub fn chunk_count(&self) -> usize {
        self.retriever.chunk_count()
    }

    pub async fn ask(&mut self, question: &str) -> Result<AskOutcome, ChatError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ChatError::Config("question is empty".to_string()));
        }

        let search_question = if self.options.condense_question && !self.history.is_empty() {
            let standalone = self.call_model(&condense_prompt(&self.history, question)).await?;
            debug!(standalone = %standalone, "condensed follow-up question");
            if standalone.is_empty() {
                question.to_string()
            } else {
                standalone
            }
        } else {
            question.to_string()
        };

        let context = self
            .retriever
            .retrieve(&search_question, self.options.top_k)
            .await?;
        let prompt = answer_prompt(&context, &self.history, question);
        debug!(
            context_chunks = context.len(),
            prompt_chars = prompt.chars().count(),
            "asking language model"
        );

        let answer = self.call_model(&prompt).await?;
        if answer.is_empty() {
            return Err(ChatError::Model(
                "language model returned an empty answer".to_string(),
            ));
        }

        self.history.push(question, answer.clone());
        info!(turns = self.history.len(), "question answered");

        Ok(AskOutcome {
            answer,
            chat_history: self.history.clone(),
        })
    }

    async fn call_model(&self, prompt: &str) -> Result<String, ChatError> {
        self.model
            .generate(prompt)
            .await
            .map(|text| text.trim().to_string())
            .map_err(|error| ChatError::Model(error.to_string()))
    }
}

fn condense_prompt(history: &ChatHistory, question: &str) -> String {
    format!(
        "Given the following conversation and a follow up question, rephrase the follow up \
         question to be a standalone question, in its original language.\n\n\
         Chat History:\n{}\nFollow Up Input: {question}\nStandalone question:",
        history.as_transcript()
    )
}

fn answer_prompt(context: &[RetrievedChunk], history: &ChatHistory, question: &str) -> String {
    let context = context
        .iter()
        .map(|hit| hit.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut prompt = format!(
        "Use the following pieces of context to answer the question at the end. If you don't \
         know the answer, just say that you don't know, don't try to make up an answer.\n\n\
         {context}\n\n"
    );
    if !history.is_empty() {
        prompt.push_str("Chat History:\n");
        prompt.push_str(&history.as_transcript());
        prompt.push_str("\n\n");
    }
    prompt.push_str(&format!("Question: {question}\nHelpful Answer:"));
    prompt
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedDocument {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextChunk {
    pub chunk_id: String,
    pub chunk_index: u64,
    /// Offset of the first character inside the raw text, in chars.
    pub char_start: usize,
    pub text: String,
}

impl TextChunk {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn char_end(&self) -> usize {
        self.char_start + self.char_len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk: TextChunk,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
    pub asked_at: DateTime<Utc>,
}

/// Append-only record of the turns in one conversation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatHistory {
    turns: Vec<ChatTurn>,
}

impl ChatHistory {
    pub fn push(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(ChatTurn {
            question: question.into(),
            answer: answer.into(),
            asked_at: Utc::now(),
        });
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Renders the history as alternating `Human:`/`Assistant:` lines.
    pub fn as_transcript(&self) -> String {
        self.turns
            .iter()
            .map(|turn| format!("Human: {}\nAssistant: {}", turn.question, turn.answer))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone)]
pub struct AskOutcome {
    pub answer: String,
    pub chat_history: ChatHistory,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadSummary {
    pub documents: usize,
    pub chunks: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_alternates_speakers() {
        let mut history = ChatHistory::default();
        history.push("What are cats?", "Mammals.");
        history.push("And dogs?", "Also mammals.");

        assert_eq!(
            history.as_transcript(),
            "Human: What are cats?\nAssistant: Mammals.\nHuman: And dogs?\nAssistant: Also mammals."
        );
    }

    #[test]
    fn chunk_end_counts_chars_not_bytes() {
        let chunk = TextChunk {
            chunk_id: "id".to_string(),
            chunk_index: 0,
            char_start: 3,
            text: "héllo".to_string(),
        };
        assert_eq!(chunk.char_end(), 8);
    }
}

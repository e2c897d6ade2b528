use crate::error::IngestError;
use crate::models::TextChunk;
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use tracing::warn;

pub const DEFAULT_SEPARATOR: &str = "\n";
pub const DEFAULT_CHUNK_SIZE: usize = 1_000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub separator: String,
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            max_chars: DEFAULT_CHUNK_SIZE,
            overlap_chars: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.separator.is_empty() {
            return Err(IngestError::InvalidChunkConfig(
                "separator must not be empty".to_string(),
            ));
        }
        if self.max_chars == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk size must be positive".to_string(),
            ));
        }
        if self.overlap_chars > self.max_chars {
            return Err(IngestError::InvalidChunkConfig(format!(
                "chunk overlap {} is larger than chunk size {}",
                self.overlap_chars, self.max_chars
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    byte_start: usize,
    byte_end: usize,
    char_start: usize,
    char_len: usize,
}

/// Splits `text` on the separator and packs the pieces into chunks of at
/// most `max_chars` characters. Each chunk is a contiguous slice of `text`.
/// When a chunk closes, its trailing pieces totalling at most
/// `overlap_chars` characters open the next one. A single piece longer than
/// `max_chars` is kept whole.
pub fn split_text(text: &str, config: &ChunkingConfig) -> Result<Vec<TextChunk>, IngestError> {
    config.validate()?;
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let separator_len = config.separator.chars().count();
    let mut chunks = Vec::new();
    let mut window: VecDeque<Segment> = VecDeque::new();
    let mut total = 0usize;

    for segment in segments(text, &config.separator) {
        let joined = if window.is_empty() { 0 } else { separator_len };
        if total + segment.char_len + joined > config.max_chars && !window.is_empty() {
            if total > config.max_chars {
                warn!(
                    chunk_chars = total,
                    max_chars = config.max_chars,
                    "created a chunk longer than the configured size"
                );
            }
            emit(text, &window, &mut chunks);

            while let Some(front) = window.front().copied() {
                let overflows = total + segment.char_len + separator_len > config.max_chars;
                // blank lines leave zero-length segments that still cost a separator
                if total <= config.overlap_chars && !overflows {
                    break;
                }
                let front_joined = if window.len() > 1 { separator_len } else { 0 };
                total -= front.char_len + front_joined;
                window.pop_front();
            }
        }

        window.push_back(segment);
        if window.len() > 1 {
            total += separator_len;
        }
        total += segment.char_len;
    }

    if total > config.max_chars {
        warn!(
            chunk_chars = total,
            max_chars = config.max_chars,
            "created a chunk longer than the configured size"
        );
    }
    emit(text, &window, &mut chunks);

    Ok(chunks)
}

fn segments(text: &str, separator: &str) -> Vec<Segment> {
    let separator_chars = separator.chars().count();
    let mut result = Vec::new();
    let mut byte_start = 0usize;
    let mut char_start = 0usize;

    for piece in text.split(separator) {
        let char_len = piece.chars().count();
        result.push(Segment {
            byte_start,
            byte_end: byte_start + piece.len(),
            char_start,
            char_len,
        });
        byte_start += piece.len() + separator.len();
        char_start += char_len + separator_chars;
    }

    result
}

fn emit(text: &str, window: &VecDeque<Segment>, chunks: &mut Vec<TextChunk>) {
    let (Some(first), Some(last)) = (window.front(), window.back()) else {
        return;
    };

    let slice = &text[first.byte_start..last.byte_end];
    if slice.trim().is_empty() {
        return;
    }

    let chunk_index = chunks.len() as u64;
    chunks.push(TextChunk {
        chunk_id: make_chunk_id(chunk_index, first.char_start, slice),
        chunk_index,
        char_start: first.char_start,
        text: slice.to_string(),
    });
}

fn make_chunk_id(index: u64, char_start: usize, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(index.to_le_bytes());
    hasher.update((char_start as u64).to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

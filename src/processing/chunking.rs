//! Character-based chunking with overlap.
//!
//! The document is split on a fixed separator and the pieces are greedily merged back into
//! chunks of at most `chunk_size` characters. When a chunk is emitted, the tail of it (at most
//! `chunk_overlap` characters worth of whole pieces) is carried into the next chunk so context
//! survives the boundary. Lengths are measured in characters, never bytes or tokens.
//!
//! A single separator-free run longer than `chunk_size` cannot be merged into anything; it is
//! cut into fixed character windows that overlap by exactly `chunk_overlap`.

use std::collections::VecDeque;

use super::types::ChunkingError;

/// Separator the pipeline splits on.
pub const DEFAULT_SEPARATOR: &str = "\n";
/// Upper bound on chunk length, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Characters shared between consecutive chunks, at most.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Fixed-configuration character splitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunker {
    separator: String,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl TextChunker {
    /// Build a chunker, rejecting sizes that cannot make progress.
    pub fn new(
        separator: impl Into<String>,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<Self, ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::InvalidChunkSize);
        }
        if chunk_overlap >= chunk_size {
            return Err(ChunkingError::OverlapTooLarge {
                overlap: chunk_overlap,
                chunk_size,
            });
        }
        Ok(Self {
            separator: separator.into(),
            chunk_size,
            chunk_overlap,
        })
    }

    /// Maximum chunk length in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Maximum overlap between consecutive chunks in characters.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into ordered, overlapping chunks.
    ///
    /// Returns an empty vector when the text holds nothing but whitespace. The result depends
    /// only on `text` and the chunker's configuration.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let pieces: Vec<&str> = if self.separator.is_empty() {
            vec![text]
        } else {
            text.split(self.separator.as_str())
                .filter(|piece| !piece.is_empty())
                .collect()
        };

        self.merge_pieces(&pieces)
            .into_iter()
            .flat_map(|chunk| self.window_oversized(chunk))
            .collect()
    }

    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let separator_len = char_len(&self.separator);
        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len + joiner_len(&current, separator_len) > self.chunk_size {
                if total > self.chunk_size {
                    tracing::warn!(
                        size = total,
                        chunk_size = self.chunk_size,
                        "Created a chunk longer than the configured size"
                    );
                }
                if !current.is_empty() {
                    if let Some(chunk) = self.join(&current) {
                        chunks.push(chunk);
                    }
                    while total > self.chunk_overlap
                        || (total + len + joiner_len(&current, separator_len) > self.chunk_size
                            && total > 0)
                    {
                        let Some(front) = current.pop_front() else {
                            break;
                        };
                        let removed = char_len(front) + joiner_len(&current, separator_len);
                        total = total.saturating_sub(removed);
                    }
                }
            }
            current.push_back(piece);
            total += len + if current.len() > 1 { separator_len } else { 0 };
        }

        if let Some(chunk) = self.join(&current) {
            chunks.push(chunk);
        }
        chunks
    }

    fn join(&self, pieces: &VecDeque<&str>) -> Option<String> {
        let joined = pieces
            .iter()
            .copied()
            .collect::<Vec<_>>()
            .join(&self.separator);
        let trimmed = joined.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    fn window_oversized(&self, chunk: String) -> Vec<String> {
        let chars: Vec<char> = chunk.chars().collect();
        if chars.len() <= self.chunk_size {
            return vec![chunk];
        }

        let stride = self.chunk_size - self.chunk_overlap;
        let mut windows = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(chars.len());
            windows.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += stride;
        }
        tracing::debug!(
            length = chars.len(),
            windows = windows.len(),
            "Split separator-free run into fixed windows"
        );
        windows
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn joiner_len(current: &VecDeque<&str>, separator_len: usize) -> usize {
    if current.is_empty() { 0 } else { separator_len }
}

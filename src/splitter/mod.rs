#[cfg(test)]
mod tests;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{RagError, Result};

/// Metadata attached to documents and carried through to stored records
pub type Metadata = BTreeMap<String, String>;

/// A loaded document: raw text plus its source metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    text: String,
    metadata: Metadata,
}

impl Document {
    #[inline]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: Metadata::new(),
        }
    }

    #[inline]
    pub fn with_metadata(text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    pub const fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Human readable identifier used in logs and ingest reports
    #[inline]
    pub fn source(&self) -> &str {
        self.metadata
            .get("file_name")
            .map_or("<unnamed>", String::as_str)
    }
}

/// A bounded piece of a document, ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// The chunk text, including any overlap with the previous chunk
    pub text: String,
    /// Metadata of the document this chunk was cut from
    pub metadata: &'a Metadata,
    /// Position of this chunk within the document
    pub index: usize,
    /// Character offset of the first character (inclusive)
    pub start: usize,
    /// Character offset one past the last character
    pub end: usize,
    /// Number of leading characters shared with the previous chunk
    pub overlap: usize,
}

impl Chunk<'_> {
    /// The chunk text without the prefix repeated from the previous chunk
    #[inline]
    pub fn core_text(&self) -> &str {
        self.text
            .char_indices()
            .nth(self.overlap)
            .and_then(|(byte, _)| self.text.get(byte..))
            .unwrap_or_default()
    }

    /// Chunk length in characters
    #[inline]
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }
}

/// Configuration for document splitting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Characters shared between adjacent chunks
    pub chunk_overlap: usize,
}

impl Default for SplitterConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 300,
            chunk_overlap: 0,
        }
    }
}

impl SplitterConfig {
    #[inline]
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::InvalidInput(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::InvalidInput(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Structural boundaries, from coarsest to finest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    Paragraph,
    Sentence,
    Word,
}

const BOUNDARIES: [Boundary; 3] = [Boundary::Paragraph, Boundary::Sentence, Boundary::Word];

impl Boundary {
    /// Whether a chunk may end right before `chars[at]`
    fn allows_break(self, chars: &[char], at: usize) -> bool {
        if at == 0 || at > chars.len() {
            return false;
        }
        let last = chars[at - 1];
        match self {
            Self::Paragraph => last == '\n' && at >= 2 && chars[at - 2] == '\n',
            Self::Sentence => {
                last == '\n'
                    || (last.is_whitespace()
                        && at >= 2
                        && matches!(chars[at - 2], '.' | '!' | '?'))
            }
            Self::Word => last.is_whitespace(),
        }
    }
}

/// Recursive character splitter
#[derive(Debug, Clone, Copy)]
pub struct DocumentSplitter {
    config: SplitterConfig,
}

impl DocumentSplitter {
    #[inline]
    pub fn new(config: SplitterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[inline]
    pub const fn config(&self) -> SplitterConfig {
        self.config
    }

    #[inline]
    pub fn split<'a>(&self, document: &'a Document) -> Vec<Chunk<'a>> {
        split_chars(
            document,
            self.config.chunk_size,
            self.config.chunk_overlap,
        )
    }
}

/// Split a document into chunks of at most `max_chunk_size` characters,
/// adjacent chunks sharing `overlap_size` characters.
#[inline]
pub fn split<'a>(
    document: &'a Document,
    max_chunk_size: usize,
    overlap_size: usize,
) -> Result<Vec<Chunk<'a>>> {
    SplitterConfig {
        chunk_size: max_chunk_size,
        chunk_overlap: overlap_size,
    }
    .validate()?;
    Ok(split_chars(document, max_chunk_size, overlap_size))
}

fn split_chars(document: &Document, max_chunk_size: usize, overlap_size: usize) -> Vec<Chunk<'_>> {
    let text = document.text();
    if text.trim().is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    // Byte offset of every char position, plus the end of the string
    let byte_offsets: Vec<usize> = text
        .char_indices()
        .map(|(byte, _)| byte)
        .chain(std::iter::once(text.len()))
        .collect();

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut overlap = 0;

    loop {
        let end = next_break(&chars, start, max_chunk_size, overlap_size);
        chunks.push(Chunk {
            text: text
                .get(byte_offsets[start]..byte_offsets[end])
                .unwrap_or_default()
                .to_string(),
            metadata: document.metadata(),
            index: chunks.len(),
            start,
            end,
            overlap,
        });

        if end >= chars.len() {
            break;
        }
        // end > start + overlap_size, so the next chunk always advances
        start = end - overlap_size;
        overlap = overlap_size;
    }

    debug!(
        "Split '{}' ({} chars) into {} chunks",
        document.source(),
        chars.len(),
        chunks.len()
    );

    chunks
}

/// Find where the chunk starting at `start` should end
fn next_break(chars: &[char], start: usize, max_chunk_size: usize, overlap_size: usize) -> usize {
    let limit = start + max_chunk_size;
    if limit >= chars.len() {
        return chars.len();
    }

    // A break must leave something beyond the overlap for the next chunk to start on
    let lowest = start + overlap_size + 1;

    BOUNDARIES
        .iter()
        .find_map(|boundary| {
            (lowest..=limit)
                .rev()
                .find(|&at| boundary.allows_break(chars, at))
        })
        .unwrap_or(limit)
}

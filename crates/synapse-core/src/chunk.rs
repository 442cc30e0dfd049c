//! Overlapping sentence-aware text chunker.
//!
//! Splits a document's extracted text into overlapping chunks of at
//! most [`ChunkerConfig::max_size`] characters, preferring to end each
//! chunk just after a sentence delimiter. Consecutive chunks overlap by
//! [`ChunkerConfig::overlap`] characters so retrieval context survives
//! boundary cuts.
//!
//! # Algorithm
//!
//! 1. Walk the text with a cursor. The candidate end of each chunk is
//!    `min(cursor + max_size, len)`.
//! 2. If the candidate end is before the end of the text, scan backward
//!    from it toward `cursor + min_size` for the latest sentence
//!    delimiter (`". "`, `"! "`, `"? "`, `".\n"`, `"!\n"`, `"?\n"`) and
//!    cut just after it. No delimiter in range keeps the max-size cut.
//! 3. Trim the slice; slices shorter than `min_size` after trimming are
//!    discarded, but the cursor advances regardless.
//! 4. Next cursor is `max(cursor + 1, end - overlap)` — forward
//!    progress is guaranteed even when the overlap would stall it.
//!
//! Offsets are measured in characters. The recorded offsets are the
//! raw pre-trim slice bounds even though the chunk content is trimmed;
//! see [`ChunkMetadata`](crate::models::ChunkMetadata).
//!
//! When transcript word segments are supplied, each chunk also gets an
//! approximate `[start_time, end_time]` range: segment spans are laid
//! out over the text assuming one separator character between words,
//! and the chunk's character range is mapped onto that layout. The
//! separator assumption makes the alignment best-effort, not
//! word-exact.

use crate::models::{ChunkMetadata, WordSegment};

/// Sentence-ending delimiter pairs searched for at chunk boundaries.
const SENTENCE_DELIMITERS: [(char, char); 6] = [
    ('.', ' '),
    ('!', ' '),
    ('?', ' '),
    ('.', '\n'),
    ('!', '\n'),
    ('?', '\n'),
];

/// Chunker size parameters, in characters.
#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    /// Maximum pre-trim slice length.
    pub max_size: usize,
    /// Minimum trimmed length for a chunk to be emitted; also the
    /// lower bound of the boundary search range.
    pub min_size: usize,
    /// Characters shared between consecutive chunks.
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_size: 1500,
            min_size: 100,
            overlap: 200,
        }
    }
}

/// A chunk before embedding and persistence: trimmed content plus
/// positional metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftChunk {
    /// 0-based index counting emitted chunks only.
    pub index: usize,
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// Chunk `text` with the default 1500/100/200 configuration.
pub fn chunk_text(text: &str, segments: Option<&[WordSegment]>) -> Vec<DraftChunk> {
    chunk_text_with(&ChunkerConfig::default(), text, segments)
}

/// Chunk `text` with an explicit configuration.
///
/// Empty or whitespace-only input produces no chunks. The result is a
/// pure function of the inputs: identical text yields byte-identical
/// chunk boundaries across runs.
pub fn chunk_text_with(
    config: &ChunkerConfig,
    text: &str,
    segments: Option<&[WordSegment]>,
) -> Vec<DraftChunk> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    let mut chunks = Vec::new();
    let mut cursor = 0usize;
    let mut index = 0usize;

    while cursor < len {
        let candidate = (cursor + config.max_size).min(len);
        let end = if candidate < len {
            find_sentence_boundary(&chars, cursor + config.min_size, candidate).unwrap_or(candidate)
        } else {
            candidate
        };

        let slice: String = chars[cursor..end].iter().collect();
        let trimmed = slice.trim();
        if trimmed.chars().count() >= config.min_size {
            let (start_time, end_time) = match segments {
                Some(segs) => align_time_range(segs, cursor, end),
                None => (None, None),
            };
            chunks.push(DraftChunk {
                index,
                content: trimmed.to_string(),
                metadata: ChunkMetadata {
                    start_offset: cursor,
                    end_offset: end,
                    start_time,
                    end_time,
                    page_number: None,
                },
            });
            index += 1;
        }

        if end >= len {
            break;
        }
        cursor = (cursor + 1).max(end.saturating_sub(config.overlap));
    }

    chunks
}

/// Scan backward from `candidate` toward `floor` for the latest
/// sentence delimiter; returns the position just after it.
fn find_sentence_boundary(chars: &[char], floor: usize, candidate: usize) -> Option<usize> {
    if candidate < 2 {
        return None;
    }
    let mut i = candidate - 2;
    loop {
        if i < floor {
            return None;
        }
        let pair = (chars[i], chars[i + 1]);
        if SENTENCE_DELIMITERS.contains(&pair) {
            return Some(i + 2);
        }
        if i == 0 {
            return None;
        }
        i -= 1;
    }
}

/// Map a chunk's character range onto the transcript segment layout.
///
/// Segments are walked in order with an offset cursor that advances by
/// `len(segment.text) + 1` per segment (the `+1` models a separator).
/// The start time comes from the first segment whose span ends past the
/// chunk start; the end time from the first segment whose span reaches
/// the chunk end, falling back to the last segment fully inside the
/// chunk. Both times are reported together or not at all.
fn align_time_range(
    segments: &[WordSegment],
    chunk_start: usize,
    chunk_end: usize,
) -> (Option<f64>, Option<f64>) {
    let mut offset = 0usize;
    let mut start_time: Option<f64> = None;
    let mut end_time: Option<f64> = None;
    let mut last_contained_end: Option<f64> = None;

    for segment in segments {
        let seg_start = offset;
        let seg_end = offset + segment.text.chars().count();

        if start_time.is_none() && seg_end > chunk_start {
            start_time = Some(segment.start);
        }
        if seg_start >= chunk_start && seg_end <= chunk_end {
            last_contained_end = Some(segment.end);
        }
        if seg_end >= chunk_end {
            end_time = Some(segment.end);
            break;
        }

        offset = seg_end + 1;
    }

    match (start_time, end_time.or(last_contained_end)) {
        (Some(start), Some(end)) => (Some(start), Some(end)),
        _ => (None, None),
    }
}

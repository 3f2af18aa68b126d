//! Sliding-window text chunking.
//!
//! Splits extracted text into fixed-size character windows with a configured
//! overlap between neighbors, so sentences cut at a window boundary reappear
//! at the start of the next chunk. Window arithmetic is defined over
//! characters, never bytes, so multi-byte text chunks cleanly.

use thiserror::Error;

/// Errors raised by invalid chunking parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkConfigError {
    /// Chunk size must be at least one character.
    #[error("Chunk size must be greater than zero")]
    InvalidChunkSize,
    /// An overlap at or above the window size would never advance.
    #[error("Chunk overlap ({overlap}) must be smaller than the chunk size ({chunk_size})")]
    OverlapTooLarge {
        /// The configured overlap.
        overlap: usize,
        /// The configured window size.
        chunk_size: usize,
    },
}

/// The windows produced for one document, plus what the chunk ceiling cost.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    /// Chunk texts in document order.
    pub chunks: Vec<String>,
    /// Characters never emitted because the chunk ceiling was reached.
    pub dropped_chars: usize,
}

/// Split `text` into overlapping windows of at most `chunk_size` characters.
///
/// Each window after the first starts `chunk_size - overlap` characters past
/// the previous start, so adjacent chunks share exactly `overlap` characters
/// (except a shorter final window). At most `max_chunks` windows are emitted;
/// text beyond the ceiling is dropped and counted in the returned plan.
pub fn chunk_text(
    text: &str,
    chunk_size: usize,
    overlap: usize,
    max_chunks: usize,
) -> Result<ChunkPlan, ChunkConfigError> {
    if chunk_size == 0 {
        return Err(ChunkConfigError::InvalidChunkSize);
    }
    if overlap >= chunk_size {
        return Err(ChunkConfigError::OverlapTooLarge {
            overlap,
            chunk_size,
        });
    }

    let offsets: Vec<usize> = text.char_indices().map(|(offset, _)| offset).collect();
    let total = offsets.len();
    if total == 0 {
        return Ok(ChunkPlan {
            chunks: Vec::new(),
            dropped_chars: 0,
        });
    }
    let byte_at = |char_index: usize| {
        offsets
            .get(char_index)
            .copied()
            .unwrap_or(text.len())
    };

    let ceiling = max_chunks.max(1);
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let covered = loop {
        let end = (start + chunk_size).min(total);
        chunks.push(text[byte_at(start)..byte_at(end)].to_string());
        if end == total || chunks.len() == ceiling {
            break end;
        }
        start = end - overlap;
    };

    Ok(ChunkPlan {
        chunks,
        dropped_chars: total - covered,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(text: &str, chunk_size: usize, overlap: usize) -> ChunkPlan {
        chunk_text(text, chunk_size, overlap, usize::MAX).unwrap()
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let plan = plan("hello", 700, 100);
        assert_eq!(plan.chunks, vec!["hello".to_string()]);
        assert_eq!(plan.dropped_chars, 0);
    }

    #[test]
    fn empty_text_produces_no_chunks() {
        let plan = plan("", 700, 100);
        assert!(plan.chunks.is_empty());
    }

    #[test]
    fn chunk_count_follows_the_window_stride() {
        // 1000 chars, 200-char windows advancing 175 at a time:
        // ceil((1000 - 25) / 175) = 6 chunks.
        let text: String = ('a'..='z').cycle().take(1000).collect();
        let plan = plan(&text, 200, 25);
        assert_eq!(plan.chunks.len(), 6);
        assert_eq!(plan.chunks[0].len(), 200);
        // Final window carries only what remains: 1000 - 875 = 125 chars.
        assert_eq!(plan.chunks[5].len(), 125);
    }

    #[test]
    fn adjacent_chunks_share_the_overlap() {
        let text: String = ('a'..='z').cycle().take(1000).collect();
        let plan = plan(&text, 200, 25);
        for pair in plan.chunks.windows(2) {
            let tail: String = pair[0].chars().skip(pair[0].chars().count() - 25).collect();
            let head: String = pair[1].chars().take(25).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn de_overlapped_chunks_reconstruct_the_document() {
        let text: String = ('a'..='z').cycle().take(1000).collect();
        let plan = plan(&text, 200, 25);
        let mut rebuilt = plan.chunks[0].clone();
        for chunk in &plan.chunks[1..] {
            rebuilt.extend(chunk.chars().skip(25));
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn ceiling_drops_the_remainder_and_counts_it() {
        let text: String = ('a'..='z').cycle().take(1000).collect();
        let plan = chunk_text(&text, 200, 25, 3).unwrap();
        assert_eq!(plan.chunks.len(), 3);
        // Three windows cover chars 0..550; the rest never becomes a chunk.
        assert_eq!(plan.dropped_chars, 450);
    }

    #[test]
    fn windows_count_characters_not_bytes() {
        let text: String = "é".repeat(30);
        let plan = plan(&text, 12, 2);
        assert_eq!(plan.chunks.len(), 3);
        for chunk in &plan.chunks[..2] {
            assert_eq!(chunk.chars().count(), 12);
        }
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        assert_eq!(
            chunk_text("text", 0, 0, 10).unwrap_err(),
            ChunkConfigError::InvalidChunkSize
        );
    }

    #[test]
    fn overlap_at_or_above_chunk_size_is_rejected() {
        assert_eq!(
            chunk_text("text", 10, 10, 10).unwrap_err(),
            ChunkConfigError::OverlapTooLarge {
                overlap: 10,
                chunk_size: 10
            }
        );
        assert!(chunk_text("text", 10, 9, 10).is_ok());
    }
}

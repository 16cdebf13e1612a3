//! Sliding-window text chunking.
//!
//! Fixed-size windows with overlap, snapped to sentence/word boundaries where
//! possible so chunks read cleanly. Offsets are byte offsets into the source
//! text, always on UTF-8 char boundaries.

use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ChunkResult {
    pub id: Uuid,
    pub text: String,
    pub index: usize,
    pub start_offset: usize,
    pub end_offset: usize,
}

pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    min_chunk_size: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize, min_chunk_size: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            min_chunk_size,
        }
    }

    pub fn chunk(&self, text: &str) -> Vec<ChunkResult> {
        if text.len() <= self.chunk_size {
            if text.len() < self.min_chunk_size {
                return Vec::new();
            }
            return vec![ChunkResult {
                id: Uuid::new_v4(),
                text: text.to_string(),
                index: 0,
                start_offset: 0,
                end_offset: text.len(),
            }];
        }

        let mut chunks = Vec::new();
        let mut start = 0;
        let mut index = 0;

        while start < text.len() {
            let window_end = floor_char_boundary(text, (start + self.chunk_size).min(text.len()));
            let end = if window_end < text.len() {
                self.break_point(text, start, window_end)
            } else {
                window_end
            };

            let chunk_text = &text[start..end];
            if chunk_text.len() >= self.min_chunk_size {
                chunks.push(ChunkResult {
                    id: Uuid::new_v4(),
                    text: chunk_text.to_string(),
                    index,
                    start_offset: start,
                    end_offset: end,
                });
                index += 1;
            }

            // Step forward, keeping `chunk_overlap` bytes of context
            let consumed = end - start;
            let step = if consumed > self.chunk_overlap {
                consumed - self.chunk_overlap
            } else {
                consumed
            };
            let next = floor_char_boundary(text, start + step);
            // Flooring a sub-char step can land back on `start`; always
            // advance at least one char so the loop terminates.
            start = if next > start {
                next
            } else {
                next_char_boundary(text, start)
            };
            if start >= text.len() {
                break;
            }
        }

        chunks
    }

    /// Find a natural break near `preferred_end`, searching back at most 200
    /// bytes. Preference: paragraph break, sentence end, line break, space.
    fn break_point(&self, text: &str, start: usize, preferred_end: usize) -> usize {
        let search_start =
            floor_char_boundary(text, preferred_end.saturating_sub(200).max(start));
        if search_start >= preferred_end {
            return preferred_end;
        }
        let region = &text[search_start..preferred_end];

        for pattern in ["\n\n", ". ", ".\n"] {
            if let Some(pos) = region.rfind(pattern) {
                return search_start + pos + pattern.len();
            }
        }
        for pattern in ['\n', ' '] {
            if let Some(pos) = region.rfind(pattern) {
                return search_start + pos + 1;
            }
        }
        preferred_end
    }
}

/// Smallest UTF-8 char boundary strictly greater than `pos`.
fn next_char_boundary(text: &str, pos: usize) -> usize {
    let mut p = pos + 1;
    while p < text.len() && !text.is_char_boundary(p) {
        p += 1;
    }
    p.min(text.len())
}

/// Round a byte offset down to the nearest UTF-8 char boundary.
fn floor_char_boundary(text: &str, pos: usize) -> usize {
    if pos >= text.len() {
        return text.len();
    }
    let mut p = pos;
    while p > 0 && !text.is_char_boundary(p) {
        p -= 1;
    }
    p
}

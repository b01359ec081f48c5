//! Recursive character text splitting with bounded overlap
//!
//! The text is first cut into pieces no longer than `chunk_size`, trying
//! paragraph breaks, then line breaks, sentence bounds, word bounds and
//! finally single characters. Pieces are then merged greedily into chunks.
//! Every chunk is a contiguous substring of the input and consecutive chunks
//! share at most `overlap` characters, so dropping each chunk's leading
//! overlap and concatenating reproduces the input exactly.

use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;
use crate::error::Result;
use crate::types::Chunk;

/// Boundary kinds tried in order of preference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    Paragraph,
    Line,
    Sentence,
    Word,
    Char,
}

const BOUNDARIES: [Boundary; 5] = [
    Boundary::Paragraph,
    Boundary::Line,
    Boundary::Sentence,
    Boundary::Word,
    Boundary::Char,
];

/// A contiguous run of the input no longer than `chunk_size` characters
#[derive(Debug, Clone, Copy)]
struct Piece {
    byte_start: usize,
    byte_end: usize,
    char_start: usize,
    chars: usize,
}

/// Splits text into overlapping, bounded-length chunks
#[derive(Debug, Clone)]
pub struct TextSplitter {
    /// Maximum chunk size in characters
    chunk_size: usize,
    /// Maximum characters shared by neighbouring chunks
    overlap: usize,
}

impl TextSplitter {
    /// Create a splitter, validating that overlap is smaller than the size
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        ChunkingConfig {
            chunk_size,
            chunk_overlap: overlap,
        }
        .validate()?;

        Ok(Self { chunk_size, overlap })
    }

    /// Create a splitter from configuration
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split text into chunks
    ///
    /// The returned iterator is lazy and can be cloned to restart it.
    pub fn split<'a>(&self, text: &'a str) -> Chunks<'a> {
        let mut pieces = Vec::new();
        let mut char_cursor = 0;
        self.collect_pieces(text, 0, text.len(), 0, &mut char_cursor, &mut pieces);

        Chunks {
            text,
            pieces,
            chunk_size: self.chunk_size,
            overlap: self.overlap,
            window_start: 0,
            window_end: 0,
            window_chars: 0,
            emitted_end: 0,
            next_index: 0,
        }
    }

    /// Recursively cut `text[start..end]` into pieces that fit
    fn collect_pieces(
        &self,
        text: &str,
        start: usize,
        end: usize,
        level: usize,
        char_cursor: &mut usize,
        out: &mut Vec<Piece>,
    ) {
        if start == end {
            return;
        }

        let slice = &text[start..end];
        let chars = slice.chars().count();

        if chars <= self.chunk_size || level >= BOUNDARIES.len() {
            out.push(Piece {
                byte_start: start,
                byte_end: end,
                char_start: *char_cursor,
                chars,
            });
            *char_cursor += chars;
            return;
        }

        for (offset, boundary) in BOUNDARIES[level..].iter().enumerate() {
            let parts = segment(slice, *boundary);
            if parts.len() <= 1 {
                continue;
            }

            let next_level = level + offset + 1;
            for (rel_start, rel_end) in parts {
                self.collect_pieces(
                    text,
                    start + rel_start,
                    start + rel_end,
                    next_level,
                    char_cursor,
                    out,
                );
            }
            return;
        }

        // A single character longer than chunk_size cannot happen for
        // chunk_size >= 1; keep the slice whole rather than loop.
        out.push(Piece {
            byte_start: start,
            byte_end: end,
            char_start: *char_cursor,
            chars,
        });
        *char_cursor += chars;
    }
}

/// Byte ranges of contiguous segments covering `slice`, cut after each boundary
fn segment(slice: &str, boundary: Boundary) -> Vec<(usize, usize)> {
    match boundary {
        Boundary::Paragraph => split_after(slice, "\n\n"),
        Boundary::Line => split_after(slice, "\n"),
        Boundary::Sentence => slice
            .split_sentence_bound_indices()
            .map(|(i, s)| (i, i + s.len()))
            .collect(),
        Boundary::Word => slice
            .split_word_bound_indices()
            .map(|(i, s)| (i, i + s.len()))
            .collect(),
        Boundary::Char => slice
            .char_indices()
            .map(|(i, c)| (i, i + c.len_utf8()))
            .collect(),
    }
}

/// Split keeping each separator attached to the segment it ends
fn split_after(slice: &str, separator: &str) -> Vec<(usize, usize)> {
    let mut parts = Vec::new();
    let mut last = 0;
    for (i, m) in slice.match_indices(separator) {
        let end = i + m.len();
        parts.push((last, end));
        last = end;
    }
    if last < slice.len() {
        parts.push((last, slice.len()));
    }
    parts
}

/// Lazy sequence of chunks produced by [`TextSplitter::split`]
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    text: &'a str,
    pieces: Vec<Piece>,
    chunk_size: usize,
    overlap: usize,
    /// First piece of the current window
    window_start: usize,
    /// One past the last piece of the current window
    window_end: usize,
    window_chars: usize,
    /// Pieces before this index have been emitted in some chunk
    emitted_end: usize,
    next_index: u32,
}

impl Chunks<'_> {
    fn emit(&mut self) -> Chunk {
        let first = self.pieces[self.window_start];
        let last = self.pieces[self.window_end - 1];

        let chunk = Chunk {
            index: self.next_index,
            content: self.text[first.byte_start..last.byte_end].to_string(),
            char_start: first.char_start,
            char_end: last.char_start + last.chars,
        };

        self.next_index += 1;
        self.emitted_end = self.window_end;
        chunk
    }
}

impl Iterator for Chunks<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        loop {
            if self.window_end == self.pieces.len() {
                if self.window_end > self.emitted_end {
                    return Some(self.emit());
                }
                return None;
            }

            let incoming = self.pieces[self.window_end].chars;

            if self.window_end > self.window_start
                && self.window_chars + incoming > self.chunk_size
            {
                let chunk = self.emit();

                // Keep a tail of at most `overlap` chars that still leaves room
                while self.window_start < self.window_end
                    && (self.window_chars > self.overlap
                        || self.window_chars + incoming > self.chunk_size)
                {
                    self.window_chars -= self.pieces[self.window_start].chars;
                    self.window_start += 1;
                }

                return Some(chunk);
            }

            self.window_chars += incoming;
            self.window_end += 1;
        }
    }
}

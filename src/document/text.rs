//! Text utilities for position conversion.
//!
//! Provides line lookup and LSP position <-> byte offset conversion with proper
//! UTF-16 handling. Lines are split on `\n`; a trailing `\r` is not part of a
//! line's text, matching what editors report as line content.

use tower_lsp::lsp_types::{Position, Range};

/// Pre-computed line index for efficient position lookups.
///
/// LSP positions use line/column where column is in UTF-16 code units.
/// A document always has at least one line, even when empty.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offset where each line starts.
    line_starts: Vec<usize>,
    /// Source text (needed for UTF-16 column calculation).
    source: String,
}

impl LineIndex {
    /// Build a line index from source text.
    pub fn new(source: String) -> Self {
        let mut line_starts = vec![0];

        for (i, c) in source.char_indices() {
            if c == '\n' {
                line_starts.push(i + 1);
            }
        }

        Self {
            line_starts,
            source,
        }
    }

    /// Get the source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of lines in the document.
    pub fn line_count(&self) -> u32 {
        self.line_starts.len() as u32
    }

    /// Byte bounds of a line's content, excluding the line terminator.
    fn line_bounds(&self, line: usize) -> Option<(usize, usize)> {
        let start = *self.line_starts.get(line)?;
        let mut end = self
            .line_starts
            .get(line + 1)
            .map(|&next| next - 1) // Exclude newline
            .unwrap_or(self.source.len());

        if end > start && self.source.as_bytes()[end - 1] == b'\r' {
            end -= 1;
        }

        Some((start, end))
    }

    /// Text of a line without its terminator.
    pub fn line(&self, line: u32) -> Option<&str> {
        let (start, end) = self.line_bounds(line as usize)?;
        Some(&self.source[start..end])
    }

    /// Position just past the last character of a line.
    ///
    /// Out-of-range lines clamp to the end of the document.
    pub fn line_end(&self, line: u32) -> Position {
        let line = line.min(self.line_count() - 1);
        let width = self
            .line(line)
            .map(|text| text.encode_utf16().count() as u32)
            .unwrap_or(0);
        Position::new(line, width)
    }

    /// Range covering the whole content of a line.
    pub fn line_range(&self, line: u32) -> Range {
        let end = self.line_end(line);
        Range::new(Position::new(end.line, 0), end)
    }

    /// Convert an LSP position to a byte offset.
    ///
    /// Columns past the end of a line clamp to the line end.
    /// Returns None if the line is out of bounds.
    pub fn position_to_offset(&self, position: Position) -> Option<usize> {
        let (line_start, line_end) = self.line_bounds(position.line as usize)?;
        let line_slice = &self.source[line_start..line_end];

        // Walk UTF-16 code units to find byte offset
        let mut utf16_col = 0u32;
        for (i, c) in line_slice.char_indices() {
            if utf16_col >= position.character {
                return Some(line_start + i);
            }
            utf16_col += c.len_utf16() as u32;
        }

        // Position is at or past end of line
        Some(line_end)
    }

    /// Text between two positions.
    ///
    /// Returns an empty string when the range is inverted or starts outside
    /// the document; an end past the document clamps to the document end.
    pub fn slice(&self, range: Range) -> &str {
        let Some(start) = self.position_to_offset(range.start) else {
            return "";
        };
        let end = self
            .position_to_offset(range.end)
            .unwrap_or(self.source.len());

        if start > end {
            return "";
        }
        &self.source[start..end]
    }
}

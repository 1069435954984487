//! Source locations for diagnostics.
//!
//! - `Span`: byte range plus the 1-based line/column of its start
//! - `SourceMap`: every file that took part in a compilation
//! - `SourceFile`: one file with a line index
//!
//! Syntax nodes coming from an external recognizer may carry only a
//! line/column pair; such spans have an empty byte range and the formatter
//! falls back to the cached position.
//!
//! # Examples
//!
//! ```
//! # use pddl_ast::foundation::span::*;
//! # use std::path::PathBuf;
//! let mut map = SourceMap::new();
//! let file_id = map.add_file(PathBuf::from("blocks.pddl"), "(define\n (domain blocks))".to_string());
//! let span = Span::new(file_id, 9, 24, 2, 2);
//!
//! assert_eq!(map.file_path(&span).and_then(|p| p.to_str()), Some("blocks.pddl"));
//! assert_eq!(map.snippet(&span), Some("(domain blocks)"));
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Source location of a syntax node or diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Index into `SourceMap::files`
    pub file_id: u16,
    /// Byte offset of the start position
    pub start: u32,
    /// Byte offset of the end position (exclusive)
    pub end: u32,
    /// 1-based line of the start position
    pub line: u32,
    /// 1-based column of the start position
    pub column: u32,
}

/// All source files of one compilation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

/// A single source file with line indexing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// Path the file was read from (or a synthetic name)
    pub path: PathBuf,
    /// Original source text
    pub source: String,
    /// Byte offsets of each line start, followed by an EOF sentinel
    pub line_starts: Vec<u32>,
}

impl Span {
    /// Create a new span.
    pub fn new(file_id: u16, start: u32, end: u32, line: u32, column: u32) -> Self {
        Self {
            file_id,
            start,
            end,
            line,
            column,
        }
    }

    /// Span carrying only a line/column pair.
    pub fn at(line: u32, column: u32) -> Self {
        Self::new(0, 0, 0, line, column)
    }

    /// Zero-length span at the start of a file.
    pub fn zero(file_id: u16) -> Self {
        Self::new(file_id, 0, 0, 1, 1)
    }

    /// Check if this span is zero-length.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Length in bytes.
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Span covering both `self` and `other`.
    ///
    /// Spans from different files are not merged; `self` is returned.
    pub fn merge(&self, other: &Span) -> Span {
        if self.file_id != other.file_id {
            return *self;
        }
        let (line, column) = if (other.line, other.column) < (self.line, self.column) {
            (other.line, other.column)
        } else {
            (self.line, self.column)
        };
        Span {
            file_id: self.file_id,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line,
            column,
        }
    }
}

impl SourceMap {
    /// Create an empty source map.
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Add a source file and return its ID.
    ///
    /// Returns `u16::MAX` once the map is full; spans pointing there resolve
    /// to no file and format from their cached line/column.
    pub fn add_file(&mut self, path: PathBuf, source: String) -> u16 {
        let Ok(file_id) = u16::try_from(self.files.len()) else {
            return u16::MAX;
        };
        self.files.push(SourceFile::new(path, source));
        file_id
    }

    /// Get the source file for a span.
    pub fn file(&self, span: &Span) -> Option<&SourceFile> {
        self.files.get(span.file_id as usize)
    }

    /// Get a file by ID.
    pub fn get(&self, file_id: u16) -> Option<&SourceFile> {
        self.files.get(file_id as usize)
    }

    /// Get the file path for a span.
    pub fn file_path(&self, span: &Span) -> Option<&Path> {
        self.file(span).map(|f| f.path.as_path())
    }

    /// Get the source snippet for a span.
    pub fn snippet(&self, span: &Span) -> Option<&str> {
        self.file(span)?
            .source
            .get(span.start as usize..span.end as usize)
    }

    /// Get the 1-based (line, column) for a span's start.
    pub fn line_col(&self, span: &Span) -> (u32, u32) {
        match self.file(span) {
            Some(file) if !span.is_empty() => file.line_col(span.start),
            _ => (span.line, span.column),
        }
    }

    /// Number of files in this map.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

impl SourceFile {
    /// Create a new source file with precomputed line starts.
    pub fn new(path: PathBuf, source: String) -> Self {
        let line_starts = compute_line_starts(&source);
        Self {
            path,
            source,
            line_starts,
        }
    }

    /// File name used in diagnostics.
    pub fn name(&self) -> String {
        self.path.display().to_string()
    }

    /// 1-based (line, column) for a byte offset.
    ///
    /// Offsets past EOF clamp to the last position.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let offset = offset.min(self.source.len() as u32);
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx.min(self.line_starts.len().saturating_sub(2)),
            Err(idx) => idx.max(1) - 1,
        };
        let line = (line_idx + 1) as u32;
        let col = offset - self.line_starts[line_idx] + 1;
        (line, col)
    }

    /// Byte range for a 1-based line number.
    pub fn line_range(&self, line: u32) -> Option<(u32, u32)> {
        if line == 0 || line as usize >= self.line_starts.len() {
            return None;
        }
        let idx = (line - 1) as usize;
        Some((self.line_starts[idx], self.line_starts[idx + 1]))
    }

    /// Text of a 1-based line, without its line terminator.
    pub fn line_text(&self, line: u32) -> Option<&str> {
        let (start, end) = self.line_range(line)?;
        let text = &self.source[start as usize..end as usize];
        Some(text.trim_end_matches(['\n', '\r']))
    }

    /// Number of lines in this file.
    pub fn line_count(&self) -> usize {
        self.line_starts.len().saturating_sub(1)
    }
}

/// Compute byte offsets of line starts.
///
/// The result always starts with 0 and ends with an EOF sentinel, so an
/// empty file has one (empty) line.
fn compute_line_starts(source: &str) -> Vec<u32> {
    let mut starts = vec![0];
    for (i, ch) in source.char_indices() {
        if ch == '\n' {
            starts.push((i + 1) as u32);
        }
    }
    if starts.last() != Some(&(source.len() as u32)) {
        starts.push(source.len() as u32);
    }
    starts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(text: &str) -> SourceFile {
        SourceFile::new(PathBuf::from("t.pddl"), text.to_string())
    }

    #[test]
    fn test_snippet_stays_inside_the_file() {
        let mut map = SourceMap::new();
        let id = map.add_file(PathBuf::from("t.pddl"), "(define\n (domain d))".to_string());
        assert_eq!(map.snippet(&Span::new(id, 9, 19, 2, 2)), Some("(domain d)"));
        assert_eq!(map.snippet(&Span::new(id, 9, 21, 2, 2)), None);
    }

    #[test]
    fn test_line_col_lookup() {
        let f = file("(define\n  (domain d)\n)");
        assert_eq!(f.line_col(0), (1, 1));
        assert_eq!(f.line_col(8), (2, 1));
        assert_eq!(f.line_col(11), (2, 4));
        assert_eq!(f.line_col(21), (3, 1));
    }

    #[test]
    fn test_line_text_strips_terminator() {
        let f = file("a\r\nbb\nccc");
        assert_eq!(f.line_text(1), Some("a"));
        assert_eq!(f.line_text(2), Some("bb"));
        assert_eq!(f.line_text(3), Some("ccc"));
        assert_eq!(f.line_text(4), None);
        assert_eq!(f.line_count(), 3);
    }

    #[test]
    fn test_span_merge() {
        let a = Span::new(0, 4, 8, 1, 5);
        let b = Span::new(0, 10, 20, 2, 1);
        let m = a.merge(&b);
        assert_eq!((m.start, m.end, m.line, m.column), (4, 20, 1, 5));

        let other_file = Span::new(1, 0, 3, 1, 1);
        assert_eq!(a.merge(&other_file), a);
    }

    #[test]
    fn test_line_col_falls_back_to_cached_position() {
        let map = SourceMap::new();
        let span = Span::at(7, 3);
        assert_eq!(map.line_col(&span), (7, 3));
    }
}

//! Sources of the files being rewritten, kept for locations and code frames.

use crate::span::{FileId, Location, Span};
use std::path::Path;

/// Lines shown above and below the offending line in a code frame.
const FRAME_CONTEXT_LINES: u32 = 2;

#[derive(Debug)]
struct SourceFile {
    name: String,
    source: String,
    /// Byte offset of the first character of each line
    line_starts: Vec<u32>,
}

impl SourceFile {
    fn new(name: String, source: String) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i as u32 + 1))
            .collect();
        Self {
            name,
            source,
            line_starts,
        }
    }

    /// 1-indexed line and column of a byte offset.
    fn line_column(&self, offset: u32) -> (u32, u32) {
        let offset = offset.min(self.source.len() as u32);
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let column = offset - self.line_starts[line - 1] + 1;
        (line as u32, column)
    }

    fn code_frame(&self, span: Span) -> String {
        let (line, column) = self.line_column(span.start);
        let first = line.saturating_sub(FRAME_CONTEXT_LINES).max(1);
        let last = line + FRAME_CONTEXT_LINES;
        let width = last.to_string().len();

        let mut frame = String::new();
        let lines = self.source.lines().skip(first as usize - 1);
        for (number, text) in (first..=last).zip(lines) {
            let marker = if number == line { '>' } else { ' ' };
            frame.push_str(&format!("{} {:>width$} | {}\n", marker, number, text));

            if number == line {
                let indent = column as usize - 1;
                let underline = (span.end.saturating_sub(span.start) as usize)
                    .min(text.len().saturating_sub(indent))
                    .max(1);
                frame.push_str(&format!(
                    "  {:>width$} | {}{}\n",
                    "",
                    " ".repeat(indent),
                    "^".repeat(underline)
                ));
            }
        }
        frame
    }
}

/// The files of one run, indexed by [`FileId`].
#[derive(Debug, Default)]
pub struct SourceCache {
    files: Vec<SourceFile>,
}

impl SourceCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file and return the id its spans use.
    pub fn add_file(&mut self, path: impl AsRef<Path>, source: String) -> FileId {
        let name = path.as_ref().to_string_lossy().into_owned();
        self.files.push(SourceFile::new(name, source));
        FileId(self.files.len() as u32 - 1)
    }

    /// File, line and column where `span` starts.
    pub fn location(&self, span: Span) -> Option<Location> {
        let file = self.files.get(span.file_id.0 as usize)?;
        let (line, column) = file.line_column(span.start);
        Some(Location {
            file: file.name.clone(),
            line,
            column,
        })
    }

    /// The lines around `span`, with the offending range underlined.
    ///
    /// ```text
    ///   1 | paddingStatement();
    /// > 2 | idx(1, 2, 3);
    ///     | ^^^^^^^^^^^^
    /// ```
    pub fn code_frame(&self, span: Span) -> Option<String> {
        Some(self.files.get(span.file_id.0 as usize)?.code_frame(span))
    }
}

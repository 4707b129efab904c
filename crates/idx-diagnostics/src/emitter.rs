//! Rendering diagnostics for people (terminal) and for tools (JSON lines).

use crate::diagnostic::{Diagnostic, DiagnosticCode, Diagnostics, Severity};
use crate::source_cache::SourceCache;
use crate::span::Location;
use console::Style;
use serde::Serialize;
use std::io::Write;

/// Writes diagnostics somewhere.
pub trait DiagnosticEmitter {
    /// Write one diagnostic, resolving its locations through `cache`.
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()>;

    /// Write every diagnostic of a run.
    fn emit_all(&mut self, diagnostics: &Diagnostics, cache: &SourceCache) -> std::io::Result<()> {
        for diagnostic in diagnostics.iter() {
            self.emit(diagnostic, cache)?;
        }
        Ok(())
    }
}

/// Human readable output with a code frame under each located diagnostic:
///
/// ```text
/// error[B002]: Cannot redefine `idx`.
///   --> src/a.js:3:1
///   ...code frame...
///   note: helper declared here (src/a.js:1:8)
///   = help: ...
/// ```
pub struct TerminalEmitter<W: Write> {
    writer: W,
    colored: bool,
}

impl<W: Write> TerminalEmitter<W> {
    /// Create an emitter; `colored` turns ANSI styling on or off.
    pub fn new(writer: W, colored: bool) -> Self {
        Self { writer, colored }
    }

    fn style(&self, style: Style) -> Style {
        style.force_styling(self.colored)
    }

    fn severity_style(&self, severity: Severity) -> Style {
        let style = match severity {
            Severity::Error => Style::new().red(),
            Severity::Warning => Style::new().yellow(),
            Severity::Hint => Style::new().blue(),
        };
        self.style(style.bold())
    }
}

impl<W: Write> DiagnosticEmitter for TerminalEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()> {
        let accent = self.style(Style::new().cyan());

        writeln!(
            self.writer,
            "{}: {}",
            self.severity_style(diagnostic.severity)
                .apply_to(format!("{}[{}]", diagnostic.severity, diagnostic.code)),
            diagnostic.message
        )?;

        if let Some(span) = diagnostic.span {
            if let Some(loc) = cache.location(span) {
                writeln!(self.writer, "  {} {}", accent.apply_to("-->"), loc)?;
            }
            for line in cache.code_frame(span).iter().flat_map(|f| f.lines()) {
                writeln!(self.writer, "  {}", line)?;
            }
        }

        for note in &diagnostic.notes {
            match note.span.and_then(|s| cache.location(s)) {
                Some(loc) => writeln!(
                    self.writer,
                    "  {}: {} ({})",
                    accent.apply_to("note"),
                    note.message,
                    loc
                )?,
                None => writeln!(self.writer, "  {}: {}", accent.apply_to("note"), note.message)?,
            }
        }

        if let Some(help) = &diagnostic.help {
            writeln!(self.writer, "  {} {}", accent.apply_to("= help:"), help)?;
        }

        writeln!(self.writer)
    }
}

/// One JSON object per line.
pub struct JsonEmitter<W: Write> {
    writer: W,
}

impl<W: Write> JsonEmitter<W> {
    /// Create an emitter writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

#[derive(Serialize)]
struct JsonDiagnostic<'a> {
    code: DiagnosticCode,
    severity: Severity,
    message: &'a str,
    location: Option<Location>,
    span: Option<JsonRange>,
    help: Option<&'a str>,
    notes: Vec<JsonNote<'a>>,
}

#[derive(Serialize)]
struct JsonRange {
    start: u32,
    end: u32,
}

#[derive(Serialize)]
struct JsonNote<'a> {
    message: &'a str,
    location: Option<String>,
}

impl<W: Write> DiagnosticEmitter for JsonEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()> {
        let record = JsonDiagnostic {
            code: diagnostic.code,
            severity: diagnostic.severity,
            message: &diagnostic.message,
            location: diagnostic.span.and_then(|s| cache.location(s)),
            span: diagnostic.span.map(|s| JsonRange {
                start: s.start,
                end: s.end,
            }),
            help: diagnostic.help.as_deref(),
            notes: diagnostic
                .notes
                .iter()
                .map(|note| JsonNote {
                    message: &note.message,
                    location: note
                        .span
                        .and_then(|s| cache.location(s))
                        .map(|loc| loc.to_string()),
                })
                .collect(),
        };
        serde_json::to_writer(&mut self.writer, &record)?;
        writeln!(self.writer)
    }
}
